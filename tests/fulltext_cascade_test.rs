use surgical_scout::client::fulltext::{FullTextResolver, SourceKind};
use surgical_scout::client::Article;
use surgical_scout::config::{FullTextConfig, PubMedConfig};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn article(pmid: &str, doi: Option<&str>) -> Article {
    Article {
        title: "T".to_string(),
        authors: "A".to_string(),
        journal: "J".to_string(),
        date: "2026 Jan".to_string(),
        abstract_text: "abs".to_string(),
        pmid: pmid.to_string(),
        doi: doi.map(str::to_string),
        url: None,
    }
}

fn configs(server: &MockServer) -> (PubMedConfig, FullTextConfig) {
    let pubmed = PubMedConfig {
        email: "test@example.com".to_string(),
        base_url: server.uri(),
        ..Default::default()
    };
    let fulltext = FullTextConfig {
        unpaywall_base_url: server.uri(),
        pmc_article_base_url: server.uri(),
        use_browser: false,
        browser_cookies: None,
        ..Default::default()
    };
    (pubmed, fulltext)
}

fn elink_body(pmc_ids: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "linksets": [{ "linksetdbs": [{ "links": pmc_ids }] }]
    })
}

#[tokio::test]
async fn pmc_hit_short_circuits_cascade() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/elink.fcgi"))
        .and(query_param("id", "38000001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(elink_body(&["7654321"])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/PMC7654321/pdf/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (pubmed, fulltext) = configs(&server);
    let resolver = FullTextResolver::new(&pubmed, &fulltext).unwrap();

    let resolved = resolver
        .resolve(&article("38000001", Some("10.1093/asj/sjaf001")))
        .await
        .unwrap();

    assert_eq!(resolved.source, SourceKind::Pmc);
    assert!(resolved.pdf_url.ends_with("/PMC7654321/pdf/"));
}

#[tokio::test]
async fn unpaywall_fallback_when_pmc_misses() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/elink.fcgi"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "linksets": [] })),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/10.1093/asj/sjaf001"))
        .and(query_param("email", "test@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "is_oa": true,
            "best_oa_location": { "url_for_pdf": "https://oa.example.com/paper.pdf" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (pubmed, fulltext) = configs(&server);
    let resolver = FullTextResolver::new(&pubmed, &fulltext).unwrap();

    let resolved = resolver
        .resolve(&article("38000001", Some("10.1093/asj/sjaf001")))
        .await
        .unwrap();

    assert_eq!(resolved.source, SourceKind::Unpaywall);
    assert_eq!(resolved.pdf_url, "https://oa.example.com/paper.pdf");
}

#[tokio::test]
async fn unknown_doi_everywhere_resolves_to_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/elink.fcgi"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "linksets": [] })),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/10.1093/asj/sjaf001"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (pubmed, fulltext) = configs(&server);
    let resolver = FullTextResolver::new(&pubmed, &fulltext).unwrap();

    let resolved = resolver
        .resolve(&article("38000001", Some("10.1093/asj/sjaf001")))
        .await;
    assert!(resolved.is_none());
}

#[tokio::test]
async fn closed_access_without_pmc_resolves_to_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/elink.fcgi"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "linksets": [] })),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/10.1093/asj/sjaf001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "is_oa": false,
            "best_oa_location": null
        })))
        .mount(&server)
        .await;

    let (pubmed, fulltext) = configs(&server);
    let resolver = FullTextResolver::new(&pubmed, &fulltext).unwrap();

    let resolved = resolver
        .resolve(&article("38000001", Some("10.1093/asj/sjaf001")))
        .await;
    assert!(resolved.is_none());
}
