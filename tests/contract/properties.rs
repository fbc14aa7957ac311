use proptest::prelude::*;
use serde_json::json;
use wiremock::MockServer;

use poetri::api::ApiClient;
use poetri::config::AuthApiConfig;
use poetri::net::HttpClient;
use poetri::resources::is_success;

fn client() -> ApiClient {
    let api = AuthApiConfig {
        endpoint: "https://api.example.test/v1/".to_string(),
        client_id: String::new(),
        client_secret: String::new(),
    };
    ApiClient::new(&api, HttpClient::new()).unwrap()
}

proptest! {
    #[test]
    fn query_pairs_round_trip_in_order(
        pairs in proptest::collection::vec(("[a-z]{1,6}", "[ -~]{0,12}"), 0..8)
    ) {
        let query: Vec<(String, String)> = pairs;
        let url = client().url_for("things", &query).unwrap();

        let decoded: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        prop_assert_eq!(decoded, query.clone());
        prop_assert_eq!(url.query().is_none(), query.is_empty());
    }

    #[test]
    fn integer_state_matches_numeric_truthiness(n in any::<i64>()) {
        prop_assert_eq!(is_success(&json!(n)), n != 0);
        prop_assert_eq!(is_success(&json!(n.to_string())), n != 0);
    }

    #[test]
    fn non_numeric_text_state_fails(s in "[g-wyzG-WYZ_ ]{1,10}") {
        prop_assert!(!is_success(&json!(s)));
    }
}

#[tokio::test]
async fn test_relative_resource_joins_endpoint_path() {
    let server = MockServer::start().await;
    let url = crate::common::client(&server)
        .url_for("/jwk", &[])
        .unwrap();
    assert_eq!(url.path(), "/jwk");
    assert_eq!(client().url_for("things", &[]).unwrap().path(), "/v1/things");
}
