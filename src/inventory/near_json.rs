use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // An alphabetic key directly after `{` or `,` and directly followed by `:`.
    static ref UNQUOTED_KEY_REGEX: Regex = Regex::new(r"([{,])([a-zA-Z]+):").unwrap();
}

/// Quotes bare object keys in the portal's near-JSON responses, e.g.
/// `{foiarray:[{id:"1",name:"..."}]}`.
///
/// This is a text substitution, not a parser: a string value containing `,word:`
/// or `{word:` is rewritten as well.
pub fn repair_near_json(data: &str) -> String {
    UNQUOTED_KEY_REGEX
        .replace_all(data, r#"$1"$2":"#)
        .into_owned()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::repair_near_json;

    #[rstest]
    #[case("{foiarray:[]}", r#"{"foiarray":[]}"#)]
    #[case(
        r#"{foiarray:[{id:"1",name:"a",x:7500000,y:5800000}]}"#,
        r#"{"foiarray":[{"id":"1","name":"a","x":7500000,"y":5800000}]}"#
    )]
    #[case(r#"{"already":1,quoted:2}"#, r#"{"already":1,"quoted":2}"#)]
    #[case(r#"{a:{b:1}}"#, r#"{"a":{"b":1}}"#)]
    fn test_observed_patterns_are_repaired(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(repair_near_json(input), expected);
        assert!(serde_json::from_str::<serde_json::Value>(&repair_near_json(input)).is_ok());
    }

    #[rstest]
    #[case("{ spaced: 1}")]
    #[case("{key1:1}")]
    #[case("{_private:1}")]
    fn test_non_alphabetic_keys_are_left_alone(#[case] input: &str) {
        assert_eq!(repair_near_json(input), input);
    }

    #[rstest]
    fn test_newlines_and_colons_inside_names_survive() {
        let input = "{foiarray:[{name:\"Nazwa polska: lipa\\nObwód pnia w cm: 310\",x:1,y:2}]}";
        let repaired = repair_near_json(input);
        assert!(repaired.contains("\"Nazwa polska: lipa\\nObwód pnia w cm: 310\""));
    }

    #[rstest]
    fn test_string_values_with_comma_word_colon_are_corrupted() {
        // Known limitation of the substitution.
        let repaired = repair_near_json(r#"{name:"a,b:c"}"#);
        assert_eq!(repaired, r#"{"name":"a,"b":c"}"#);
    }
}
