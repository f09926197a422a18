use serde::{Serialize, Serializer};

/// Label counts keep the order the store returned them in, so the JSON object
/// for categories lists the most frequent label first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    #[serde(serialize_with = "ordered_map")]
    pub sentiment: Vec<(String, i64)>,
    #[serde(serialize_with = "ordered_map")]
    pub categories: Vec<(String, i64)>,
    pub total: i64,
}

fn ordered_map<S: Serializer>(counts: &[(String, i64)], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(counts.iter().map(|(label, count)| (label, count)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_serialize_as_empty_objects() {
        let json = serde_json::to_value(Stats::default()).unwrap();
        assert_eq!(json, serde_json::json!({"sentiment": {}, "categories": {}, "total": 0}));
    }

    #[test]
    fn categories_keep_their_order() {
        let stats = Stats {
            sentiment: vec![("Bullish".into(), 1)],
            categories: vec![("AI Market".into(), 3), ("AI Funding".into(), 1)],
            total: 4,
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.find("AI Market").unwrap() < json.find("AI Funding").unwrap());
    }
}
