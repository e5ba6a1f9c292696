//! Type conversion helpers
//!
//! Converts database models (db::models) into the wire DTOs the API
//! returns. Record ids go out as `table:id` strings; datetimes as RFC 3339.

use surrealdb::sql::{Datetime, Thing};

pub fn thing_to_string(thing: &Thing) -> String {
    // Thing's Display wraps non-alphanumeric ids in angle brackets, which
    // clients cannot round-trip; build the plain form instead.
    format!("{}:{}", thing.tb, thing.id.to_raw())
}

pub fn option_thing_to_string(thing: &Option<Thing>) -> Option<String> {
    thing.as_ref().map(thing_to_string)
}

pub fn datetime_to_string(dt: &Datetime) -> String {
    dt.0.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thing_to_string_keeps_plain_form() {
        let thing = Thing::from(("product", "abc123"));
        assert_eq!(thing_to_string(&thing), "product:abc123");

        // ids with dashes must not come back bracket-wrapped
        let thing = Thing::from(("user", "650c-4f2a"));
        assert_eq!(thing_to_string(&thing), "user:650c-4f2a");
    }
}
