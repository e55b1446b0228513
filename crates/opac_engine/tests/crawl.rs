use std::time::{Duration, Instant};

use opac_core::{CrawlOptions, CrawlPlan, ItemRecord, NavigationError};
use opac_engine::{
    run_crawl, CancellationToken, CrawlError, CrawlEvent, CrawlHandle, CrawlSummary,
    FetchSettings, JsonLinesSink, ReqwestFetcher, RunId,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CLIENT: &str = "/webOPACClient";

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

fn setup_page(token: &str) -> String {
    format!(
        r#"<html><body>
        <form id="AdvancedSearchForm" name="AdvancedSearchForm" action="search.do">
          <input type="hidden" name="methodToCall" value="submit"/>
          <input type="hidden" name="CSId" value="{token}"/>
        </form>
        </body></html>"#
    )
}

fn listing_page(hits: &[(&str, &str)], next: Option<&str>) -> String {
    let rows: String = hits
        .iter()
        .map(|(media, id)| {
            format!(
                r#"<tr><td><img src="icon.gif" title=" {media} "/></td>
                <td><a href="javascript:void(0)">+</a><a href="singleHit.do?id={id}">Hit {id}</a></td></tr>"#
            )
        })
        .collect();
    let next = next
        .map(|href| format!(r#"<a aria-label="Nächste Seite" href="{href}">&gt;</a>"#))
        .unwrap_or_default();
    format!(
        r#"<html><body><div id="hitlist">
        <div class="paging">{next}</div>
        <table><tr><th>Typ</th><th>Titel</th></tr>{rows}</table>
        </div></body></html>"#
    )
}

fn summary_page(id: &str, copies: &[(&str, &str)]) -> String {
    let rows: String = copies
        .iter()
        .map(|(location, status)| format!("<tr><td>{location}</td><td>{status}</td></tr>"))
        .collect();
    format!(
        r#"<html><body>
        <div id="labelTitle"><a href="titleHit.do?id={id}">Permalink</a></div>
        <div id="tab-content"><table>
          <tr id="bg2"><th>Standort</th><th><p>Status</p></th></tr>
          {rows}
        </table></div>
        </body></html>"#
    )
}

fn detail_page(fields: &[(&str, &str)]) -> String {
    let cells: String = fields
        .iter()
        .map(|(label, value)| format!("<strong>{label}</strong><div>{value}</div>"))
        .collect();
    format!(
        r#"<html><body><div id="tab-content"><table><tr><td>{cells}</td></tr></table></div></body></html>"#
    )
}

/// Start page plus the three setup requests, each answering with a fresh token.
async fn mount_setup(server: &MockServer, first_listing: String) {
    Mock::given(method("GET"))
        .and(path(format!("{CLIENT}/start.do")))
        .respond_with(html(setup_page("T1")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{CLIENT}/search.do")))
        .and(query_param("methodToCall", "switchSearchPage"))
        .and(query_param("CSId", "T1"))
        .respond_with(html(setup_page("T2")))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{CLIENT}/search.do")))
        .and(query_param("methodToCallParameter", "searchPreferences"))
        .and(query_param("CSId", "T2"))
        .and(query_param("searchRestrictionValue1[2]", "1990"))
        .respond_with(html(setup_page("T3")))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{CLIENT}/search.do")))
        .and(query_param("methodToCallParameter", "submitSearch"))
        .and(query_param("CSId", "T3"))
        .and(query_param("searchString[0]", "dinosaurs"))
        .and(query_param("numberOfHits", "100"))
        .respond_with(html(first_listing))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_hit(
    server: &MockServer,
    id: &str,
    summary: ResponseTemplate,
    detail: ResponseTemplate,
) {
    Mock::given(method("GET"))
        .and(path(format!("{CLIENT}/singleHit.do")))
        .and(query_param("id", id))
        .respond_with(summary)
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{CLIENT}/titleHit.do")))
        .and(query_param("id", id))
        .respond_with(detail)
        .expect(1)
        .mount(server)
        .await;
}

fn plan_for(server: &MockServer) -> CrawlPlan {
    CrawlOptions {
        start_url: Some(format!("{}{CLIENT}/start.do", server.uri())),
        search: Some("dinosaurs".to_string()),
        year: Some("1990:2000".to_string()),
        ..CrawlOptions::default()
    }
    .into_plan()
}

async fn mount_catalog(server: &MockServer) {
    mount_setup(
        server,
        listing_page(&[("Buch", "1"), ("DVD", "2")], Some("hitList.do?page=2")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!("{CLIENT}/hitList.do")))
        .and(query_param("page", "2"))
        .respond_with(html(listing_page(&[("Buch", "3")], None)))
        .expect(1)
        .mount(server)
        .await;

    mount_hit(
        server,
        "1",
        html(summary_page(
            "1",
            &[("Zentralbibliothek", "verfügbar"), ("Magazin", "entliehen")],
        )),
        html(detail_page(&[
            ("Titel:", "Die Dinosaurier"),
            ("Schlagwort:", "Dinosaurier"),
            ("Schlagwort:", "Fossil"),
        ])),
    )
    .await;
    mount_hit(
        server,
        "2",
        html(summary_page("2", &[])),
        html(detail_page(&[("Titel:", "Urzeit")])),
    )
    .await;

    let latin1 = encoding_rs::WINDOWS_1252
        .encode(&detail_page(&[("Titel:", "Tragödie der Saurier")]))
        .0
        .into_owned();
    mount_hit(
        server,
        "3",
        html(summary_page("3", &[(" ", "")])),
        ResponseTemplate::new(200).set_body_raw(latin1, "text/html; charset=ISO-8859-1"),
    )
    .await;
}

#[tokio::test]
async fn crawl_walks_setup_listings_and_details_in_order() {
    opac_logging::initialize_for_tests();
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default()).expect("client builds");
    let mut sink = JsonLinesSink::new(Vec::new());
    let summary = run_crawl(
        &fetcher,
        &plan_for(&server),
        &mut sink,
        &CancellationToken::new(),
    )
    .await
    .expect("crawl succeeds");

    assert_eq!(
        summary,
        CrawlSummary {
            items: 3,
            listing_pages: 2,
            requests: 11,
        }
    );

    let output = String::from_utf8(sink.into_inner()).expect("utf-8 output");
    let items: Vec<Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).expect("one object per line"))
        .collect();
    assert_eq!(
        items,
        vec![
            json!({
                "Medientyp": "Buch",
                "Titel": "Die Dinosaurier",
                "Schlagwort": ["Dinosaurier", "Fossil"],
                "Exemplare": [
                    {"Standort": "Zentralbibliothek", "Status": "verfügbar"},
                    {"Standort": "Magazin", "Status": "entliehen"},
                ],
            }),
            json!({
                "Medientyp": "DVD",
                "Titel": "Urzeit",
                "Exemplare": [],
            }),
            json!({
                "Medientyp": "Buch",
                "Titel": "Tragödie der Saurier",
                "Exemplare": [],
            }),
        ]
    );
    assert!(output.lines().next().unwrap().starts_with(r#"{"Medientyp":"Buch","Titel""#));
}

#[tokio::test]
async fn disabled_next_link_still_visits_the_page_hits() {
    let server = MockServer::start().await;
    mount_setup(&server, listing_page(&[("Buch", "1")], Some("#"))).await;
    mount_hit(
        &server,
        "1",
        html(summary_page("1", &[("Magazin", "verfügbar")])),
        html(detail_page(&[("Titel:", "Letzte Seite")])),
    )
    .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default()).expect("client builds");
    let mut items: Vec<ItemRecord> = Vec::new();
    let summary = run_crawl(
        &fetcher,
        &plan_for(&server),
        &mut items,
        &CancellationToken::new(),
    )
    .await
    .expect("crawl succeeds");

    assert_eq!(
        summary,
        CrawlSummary {
            items: 1,
            listing_pages: 1,
            requests: 6,
        }
    );
    assert_eq!(items[0].media_type(), Some("Buch"));
}

#[tokio::test]
async fn cancelled_crawl_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html(setup_page("T1")))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let fetcher = ReqwestFetcher::new(FetchSettings::default()).expect("client builds");
    let mut items: Vec<ItemRecord> = Vec::new();
    let err = run_crawl(&fetcher, &plan_for(&server), &mut items, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::Cancelled));
    assert!(items.is_empty());
}

#[tokio::test]
async fn missing_permalink_stops_the_run() {
    let server = MockServer::start().await;
    mount_setup(&server, listing_page(&[("Buch", "1")], None)).await;
    Mock::given(method("GET"))
        .and(path(format!("{CLIENT}/singleHit.do")))
        .respond_with(html("<html><body><p>Sitzung abgelaufen</p></body></html>".into()))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default()).expect("client builds");
    let mut items: Vec<ItemRecord> = Vec::new();
    let err = run_crawl(
        &fetcher,
        &plan_for(&server),
        &mut items,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        CrawlError::Navigation(NavigationError::MissingLink { .. })
    ));
    assert!(items.is_empty());
}

#[tokio::test]
async fn missing_token_is_a_navigation_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{CLIENT}/start.do")))
        .respond_with(html("<html><body>Wartung</body></html>".into()))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default()).expect("client builds");
    let mut items: Vec<ItemRecord> = Vec::new();
    let err = run_crawl(
        &fetcher,
        &plan_for(&server),
        &mut items,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    match err {
        CrawlError::Navigation(NavigationError::MissingToken { state, .. }) => {
            assert_eq!(state, "Init")
        }
        other => panic!("unexpected error: {other}"),
    }
}

type RunOutcome = (Vec<ItemRecord>, Result<CrawlSummary, CrawlError>);

fn wait_for_finish(handle: &CrawlHandle, run_id: RunId) -> RunOutcome {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut items = Vec::new();
    while Instant::now() < deadline {
        match handle.recv_timeout(Duration::from_millis(100)) {
            Ok(Some(CrawlEvent::Item { run_id: id, record })) if id == run_id => items.push(record),
            Ok(Some(CrawlEvent::Finished { run_id: id, result })) if id == run_id => {
                return (items, result)
            }
            Err(stopped) => panic!("{stopped}"),
            _ => {}
        }
    }
    panic!("run {run_id} did not finish in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handle_streams_items_then_finishes() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    let plan = plan_for(&server);

    let (items, result) = tokio::task::spawn_blocking(move || {
        let handle = CrawlHandle::new(FetchSettings::default());
        handle.start(7, plan);
        wait_for_finish(&handle, 7)
    })
    .await
    .expect("collector thread");

    assert_eq!(result.expect("run succeeds").items, 3);
    let media: Vec<_> = items.iter().map(|item| item.media_type()).collect();
    assert_eq!(media, vec![Some("Buch"), Some("DVD"), Some("Buch")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handle_cancels_a_run_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{CLIENT}/start.do")))
        .respond_with(html(setup_page("T1")).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    let plan = plan_for(&server);

    let (items, result) = tokio::task::spawn_blocking(move || {
        let handle = CrawlHandle::new(FetchSettings::default());
        handle.start(1, plan);
        std::thread::sleep(Duration::from_millis(200));
        handle.cancel(1);
        wait_for_finish(&handle, 1)
    })
    .await
    .expect("collector thread");

    assert!(items.is_empty());
    assert!(matches!(result, Err(CrawlError::Cancelled)));
}
