//! OpenSearch index settings and mappings.
//!
//! Each alias is backed by an index of the same name. Both indexes use
//! `search_as_you_type` for the display fields and keep a `raw` keyword
//! sub-field on `name` for exact matches and sorting.

use serde_json::{json, Value};

use roster_shared::Alias;

fn name_field() -> Value {
    json!({
        "type": "search_as_you_type",
        "fields": {
            "raw": {
                "type": "keyword"
            }
        }
    })
}

/// Get the index settings and mappings for the index behind `alias`.
pub fn index_settings(alias: Alias) -> Value {
    let properties = match alias {
        Alias::Membership => json!({
            "name": name_field()
        }),
        Alias::People => json!({
            "name": name_field(),
            "alias": {
                "type": "search_as_you_type"
            },
            "email": {
                "type": "keyword"
            },
            "nationality": {
                "type": "keyword"
            }
        }),
    };

    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "properties": properties
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_settings() {
        let settings = index_settings(Alias::Membership);

        assert!(settings["settings"]["number_of_shards"].is_number());
        assert_eq!(
            settings["mappings"]["properties"]["name"]["type"],
            "search_as_you_type"
        );
        assert_eq!(
            settings["mappings"]["properties"]["name"]["fields"]["raw"]["type"],
            "keyword"
        );
        assert!(settings["mappings"]["properties"]["email"].is_null());
    }

    #[test]
    fn test_people_settings() {
        let settings = index_settings(Alias::People);
        let properties = &settings["mappings"]["properties"];

        assert_eq!(properties["alias"]["type"], "search_as_you_type");
        assert_eq!(properties["email"]["type"], "keyword");
        assert_eq!(properties["nationality"]["type"], "keyword");
    }
}
