use chrono::{DateTime, Utc, Weekday};

use super::MealSlot;
use crate::canonical::{group, text, text_list, CanonicalGroups, FieldGroups};
use crate::decode::{self, Decode};
use crate::document::{CollectionPath, DocPath, Fields};

/// Menu for one day of the week (`mess_menu/{weekday}`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessMenu {
    pub breakfast: Vec<String>,
    pub lunch: Vec<String>,
    pub snacks: Vec<String>,
    pub dinner: Vec<String>,
    pub special_note: String,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Document id for a weekday: `monday`, `tuesday`, ...
pub fn weekday_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Accepts full or short English day names in any case.
pub fn parse_weekday(s: &str) -> Result<Weekday, String> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| format!("Invalid day '{}'. Use a day name such as monday", s))
}

impl MessMenu {
    pub fn collection() -> CollectionPath {
        CollectionPath::known("mess_menu")
    }

    pub fn path(day: Weekday) -> DocPath {
        DocPath::known(format!("mess_menu/{}", weekday_key(day)))
    }

    pub fn items(&self, slot: MealSlot) -> &[String] {
        match slot {
            MealSlot::Breakfast => &self.breakfast,
            MealSlot::Lunch => &self.lunch,
            MealSlot::Snacks => &self.snacks,
            MealSlot::Dinner => &self.dinner,
        }
    }

    pub fn items_mut(&mut self, slot: MealSlot) -> &mut Vec<String> {
        match slot {
            MealSlot::Breakfast => &mut self.breakfast,
            MealSlot::Lunch => &mut self.lunch,
            MealSlot::Snacks => &mut self.snacks,
            MealSlot::Dinner => &mut self.dinner,
        }
    }
}

impl Decode for MessMenu {
    fn decode(_id: &str, fields: &Fields) -> Self {
        Self {
            breakfast: decode::string_list(fields, "breakfast"),
            lunch: decode::string_list(fields, "lunch"),
            snacks: decode::string_list(fields, "snacks"),
            dinner: decode::string_list(fields, "dinner"),
            special_note: decode::string(fields, "specialNote"),
            last_updated: decode::timestamp(fields, "lastUpdated"),
        }
    }
}

impl FieldGroups for MessMenu {
    fn canonical_groups(&self) -> CanonicalGroups {
        let mut groups: CanonicalGroups = MealSlot::ALL
            .iter()
            .map(|slot| (slot.key(), group([(slot.key(), text_list(self.items(*slot)))])))
            .collect();
        groups.insert("specialNote", group([("specialNote", text(&self.special_note))]));
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_weekday_keys() {
        assert_eq!(MessMenu::path(Weekday::Wed).as_str(), "mess_menu/wednesday");
        assert_eq!(parse_weekday("Friday").unwrap(), Weekday::Fri);
        assert_eq!(parse_weekday("sun").unwrap(), Weekday::Sun);
        assert!(parse_weekday("someday").is_err());
    }

    #[test]
    fn test_decode_and_groups() {
        let fields = json!({"breakfast": ["Idli", "Sambar"], "dinner": "Biryani"})
            .as_object()
            .cloned()
            .unwrap();
        let menu = MessMenu::decode("monday", &fields);

        assert_eq!(menu.items(MealSlot::Breakfast), ["Idli", "Sambar"]);
        assert_eq!(menu.items(MealSlot::Dinner), ["Biryani"]);
        assert!(menu.lunch.is_empty());

        let groups = menu.canonical_groups();
        assert_eq!(groups.len(), 5);
        assert_eq!(groups["breakfast"]["breakfast"], json!(["Idli", "Sambar"]));
    }
}
