use dlmm_manager_sdk::{keeper::Params, Error, KeeperClient};
use mockito::{Matcher, Server};
use serde_json::json;

#[tokio::test]
async fn all_pairs_sends_include_unknown_flag() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/pair/all")
        .match_query(Matcher::UrlEncoded("include_unknown".into(), "false".into()))
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"address":"pair-1"}]"#)
        .create_async()
        .await;

    let client = KeeperClient::with_base_url(server.url());
    let pairs = client.all_pairs(false).await.unwrap();

    mock.assert_async().await;
    assert_eq!(pairs, json!([{ "address": "pair-1" }]));
}

#[tokio::test]
async fn non_success_status_carries_status_and_body() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/pair/unknown-pair")
        .with_status(404)
        .with_body("pair not found")
        .create_async()
        .await;

    let client = KeeperClient::with_base_url(server.url());
    let err = client.pair("unknown-pair").await.unwrap_err();

    assert!(err.to_string().contains("API Error 404"));
    match err {
        Error::Api { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "pair not found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn pagination_params_are_forwarded() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/pair/all_with_pagination")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "2".into()),
            Matcher::UrlEncoded("limit".into(), "50".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"pairs":[],"total":0}"#)
        .create_async()
        .await;

    let mut params = Params::new();
    params.insert("page".into(), "2".into());
    params.insert("limit".into(), "50".into());
    let client = KeeperClient::with_base_url(server.url());
    let page = client.all_pairs_with_pagination(&params).await.unwrap();

    mock.assert_async().await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn time_series_endpoints_take_num_of_days() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/pair/abc/analytic/pair_tvl")
        .match_query(Matcher::UrlEncoded("num_of_days".into(), "7".into()))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let client = KeeperClient::with_base_url(server.url());
    client.pair_tvl_by_days("abc", 7).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn wallet_earning_path_includes_wallet_and_pair() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/wallet/w1/p1/earning")
        .with_status(200)
        .with_body(r#"{"total_fee_usd_claimed":1.5}"#)
        .create_async()
        .await;

    let client = KeeperClient::with_base_url(server.url());
    let earning = client.wallet_earning("w1", "p1").await.unwrap();

    mock.assert_async().await;
    assert_eq!(earning["total_fee_usd_claimed"], 1.5);
}
