//! Integration tests for the scraper
//!
//! These tests use wiremock to stand in for the Schedule of Classes site and
//! run whole scrapes end-to-end into a temporary corpus.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use testudo_scrape::config::Config;
use testudo_scrape::crawler::{scrape, ScrapeMode, Scraper};
use testudo_scrape::output::load_statistics;
use testudo_scrape::storage::{JsonStorage, Storage};
use testudo_scrape::syllabus::{NoSyllabi, SyllabusMap, SyllabusSource};
use testudo_scrape::{Level, RetryPolicy, ScrapeError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TERM: &str = "202508";

fn fixed_clock() -> String {
    "2025-08-01T12:00:00.000000Z".to_string()
}

fn no_wait(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::ZERO).with_jitter(Duration::ZERO)
}

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, data_dir: &Path) -> Config {
    let mut config = Config::default();
    config.site.base_url = format!("{}/soc", server.uri());
    config.scraper.data_dir = data_dir.to_path_buf();
    config.scraper.request_delay = 0.0;
    config
}

fn create_scraper<S: SyllabusSource>(config: Config, source: S) -> Scraper<S> {
    Scraper::new(config, source)
        .expect("Failed to build scraper")
        .with_clock(fixed_clock)
        .with_retry(no_wait(3), no_wait(2))
}

fn landing_page(departments: &[(&str, &str)]) -> String {
    let blocks: String = departments
        .iter()
        .map(|(id, name)| {
            format!(
                r#"<div class="course-prefix"><span class="prefix-abbrev">{}</span><span class="prefix-name">{}</span></div>"#,
                id, name
            )
        })
        .collect();
    format!(
        r#"<html><body>
        <select id="term-id-input"><option value="202505">Summer 2025</option><option value="202508">Fall 2025</option></select>
        {}
        </body></html>"#,
        blocks
    )
}

fn course_block(id: &str, title: &str, badge: Option<u32>) -> String {
    let badge = badge
        .map(|n| format!(r#"<a class="toggle-syllabus-link">Syllabus <span>({})</span></a>"#, n))
        .unwrap_or_default();
    format!(
        r#"<div class="course">
            <div class="course-id">{id}</div>
            <span class="course-title">{title}</span>
            <span class="course-min-credits">3</span>
            <div class="approved-course-text">All about {title}.</div>
            <span class="grading-method">Reg, P-F, Aud</span>
            <div class="gen-ed"><span>DSNS</span>, <span>FSAW</span></div>
            {badge}
        </div>"#
    )
}

const CMSC131_SECTIONS: &str = r#"
    <html><body>
    <div class="section">
        <span class="section-id">0101</span>
        <span class="section-instructor">Fawzi Emad</span>
        <span class="total-seats-count">36</span>
        <span class="open-seats-count">4</span>
        <span class="waitlist-count">2</span>
        <span class="section-days">MWF</span>
        <span class="class-start-time">10:00am -</span>
        <span class="class-end-time">10:50am</span>
        <span class="building-code">IRB</span>
        <span class="class-room">0324</span>
    </div>
    <div class="section">
        <span class="section-id">0102</span>
        <span class="total-seats-count">1,200</span>
        <span class="open-seats-count">0</span>
    </div>
    </body></html>
"#;

async fn mount_landing(server: &MockServer, departments: &[(&str, &str)]) {
    Mock::given(method("GET"))
        .and(path("/soc/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_page(departments)))
        .mount(server)
        .await;
}

async fn mount_listing(server: &MockServer, term: &str, department: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/soc/{}/{}", term, department)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_sections(server: &MockServer, term: &str, course_id: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/soc/{}/sections", term)))
        .and(query_param("courseIds", course_id))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Any section request not matched above gets an empty listing
async fn mount_empty_sections(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/soc/{}/sections", TERM)))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(server)
        .await;
}

fn json_files(dir: &Path) -> usize {
    JsonStorage::new(dir).course_files().unwrap().len()
}

#[tokio::test]
async fn test_department_scrape_end_to_end() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_landing(&server, &[("CMSC", "Computer Science")]).await;
    let listing = format!(
        r#"<html><body>{}<div class="course"><div class="course-id">CMSC132</div></div></body></html>"#,
        course_block("CMSC131", "Object-Oriented Programming I", None)
    );
    mount_listing(&server, TERM, "CMSC", listing).await;
    mount_sections(&server, TERM, "CMSC131", CMSC131_SECTIONS).await;

    let config = create_test_config(&server, dir.path());
    let mut scraper = create_scraper(config, NoSyllabi);
    scraper
        .scrape_department("CMSC", Some(TERM))
        .await
        .expect("Scrape should succeed");

    let stats = scraper.stats();
    assert_eq!(stats.total_courses, 2);
    assert_eq!(stats.successful_courses, 1);
    assert_eq!(stats.failed_courses, 1);
    assert_eq!(stats.departments_processed, 1);

    let file = dir.path().join(TERM).join("CMSC").join("CMSC131.json");
    assert!(file.exists(), "Course file should be written");
    assert!(!dir.path().join(TERM).join("CMSC").join("CMSC132.json").exists());

    let course = scraper.storage().load_course(TERM, "CMSC131").unwrap();
    assert_eq!(course.title, "Object-Oriented Programming I");
    assert_eq!(course.credits, "3");
    assert_eq!(course.description, "All about Object-Oriented Programming I.");
    assert_eq!(course.level, Level::Undergrad);
    assert_eq!(course.grading_method, vec!["Reg", "P-F", "Aud"]);
    assert_eq!(course.gen_ed, vec!["DSNS", "FSAW"]);
    assert_eq!(course.department, "Computer Science");
    assert_eq!(course.term, TERM);
    assert_eq!(course.updated, fixed_clock());
    assert_eq!(course.most_recent_syllabus, None);

    assert_eq!(course.sections.len(), 2);
    assert_eq!(course.sections[0].id, "0101");
    assert_eq!(course.sections[0].instructors, vec!["Fawzi Emad"]);
    assert_eq!(course.sections[0].seats, 36);
    assert_eq!(course.sections[0].open_seats, 4);
    assert_eq!(course.sections[0].waitlist, 2);
    assert_eq!(course.sections[0].start, "10:00am");
    assert_eq!(course.sections[1].id, "0102");
    assert_eq!(course.sections[1].seats, 1200);
    assert!(course.sections[1].instructors.is_empty());
}

#[tokio::test]
async fn test_rescrape_is_byte_identical() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_landing(&server, &[("CMSC", "Computer Science")]).await;
    let listing = format!(
        "<html><body>{}{}</body></html>",
        course_block("CMSC131", "Object-Oriented Programming I", None),
        course_block("CMSC216", "Introduction to Computer Systems", None)
    );
    mount_listing(&server, TERM, "CMSC", listing).await;
    mount_sections(&server, TERM, "CMSC131", CMSC131_SECTIONS).await;
    mount_empty_sections(&server).await;

    let file = dir.path().join(TERM).join("CMSC").join("CMSC131.json");

    let mut first = create_scraper(create_test_config(&server, dir.path()), NoSyllabi);
    first.scrape_department("CMSC", Some(TERM)).await.unwrap();
    let before = std::fs::read(&file).unwrap();

    let mut second = create_scraper(create_test_config(&server, dir.path()), NoSyllabi);
    second.scrape_department("CMSC", Some(TERM)).await.unwrap();
    let after = std::fs::read(&file).unwrap();

    assert_eq!(before, after);
    assert_eq!(json_files(dir.path()), 2);
}

#[tokio::test]
async fn test_listing_retried_after_server_errors() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_landing(&server, &[("CMSC", "Computer Science")]).await;

    // First two listing requests fail, the third succeeds
    Mock::given(method("GET"))
        .and(path(format!("/soc/{}/CMSC", TERM)))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_listing(
        &server,
        TERM,
        "CMSC",
        format!(
            "<html><body>{}</body></html>",
            course_block("CMSC131", "Object-Oriented Programming I", None)
        ),
    )
    .await;
    mount_sections(&server, TERM, "CMSC131", CMSC131_SECTIONS).await;

    let mut scraper = create_scraper(create_test_config(&server, dir.path()), NoSyllabi);
    scraper.scrape_department("CMSC", Some(TERM)).await.unwrap();

    assert_eq!(scraper.stats().successful_courses, 1);
    assert_eq!(json_files(dir.path()), 1);
}

#[tokio::test]
async fn test_section_failure_yields_empty_sections() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_landing(&server, &[("CMSC", "Computer Science")]).await;
    mount_listing(
        &server,
        TERM,
        "CMSC",
        format!(
            "<html><body>{}</body></html>",
            course_block("CMSC131", "Object-Oriented Programming I", None)
        ),
    )
    .await;

    // Section policy allows two attempts
    Mock::given(method("GET"))
        .and(path(format!("/soc/{}/sections", TERM)))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let mut scraper = create_scraper(create_test_config(&server, dir.path()), NoSyllabi);
    scraper.scrape_department("CMSC", Some(TERM)).await.unwrap();

    assert_eq!(scraper.stats().successful_courses, 1);
    assert_eq!(scraper.stats().failed_courses, 0);
    let course = scraper.storage().load_course(TERM, "CMSC131").unwrap();
    assert!(course.sections.is_empty());
}

#[tokio::test]
async fn test_full_scrape_skips_failing_department() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_landing(
        &server,
        &[("AAAS", "African American Studies"), ("CMSC", "Computer Science")],
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!("/soc/{}/AAAS", TERM)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_listing(
        &server,
        TERM,
        "CMSC",
        format!(
            "<html><body>{}</body></html>",
            course_block("CMSC131", "Object-Oriented Programming I", None)
        ),
    )
    .await;
    mount_empty_sections(&server).await;

    let mut scraper = create_scraper(create_test_config(&server, dir.path()), NoSyllabi);
    scraper
        .run(&ScrapeMode::Full, Some(TERM))
        .await
        .expect("Department failures should not end the run");

    let stats = scraper.stats();
    assert_eq!(stats.departments_processed, 2);
    assert_eq!(stats.total_courses, 1);
    assert_eq!(stats.successful_courses, 1);
    assert!(dir.path().join(TERM).join("CMSC").join("CMSC131.json").exists());
    assert!(!dir.path().join(TERM).join("AAAS").exists());
}

#[tokio::test]
async fn test_full_scrape_discovers_terms() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Landing page is read once for terms and once for departments
    Mock::given(method("GET"))
        .and(path("/soc/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(landing_page(&[("CMSC", "Computer Science")])),
        )
        .expect(2)
        .mount(&server)
        .await;
    for term in ["202505", "202508"] {
        mount_listing(
            &server,
            term,
            "CMSC",
            format!(
                "<html><body>{}</body></html>",
                course_block("CMSC131", "Object-Oriented Programming I", None)
            ),
        )
        .await;
        Mock::given(method("GET"))
            .and(path(format!("/soc/{}/sections", term)))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;
    }

    let mut scraper = create_scraper(create_test_config(&server, dir.path()), NoSyllabi);
    scraper.scrape_full(None).await.unwrap();

    assert_eq!(scraper.stats().departments_processed, 2);
    assert_eq!(scraper.stats().successful_courses, 2);

    let corpus = load_statistics(scraper.storage()).unwrap();
    assert_eq!(corpus.total_courses, 2);
    assert_eq!(corpus.courses_by_term.get("202505"), Some(&1));
    assert_eq!(corpus.courses_by_term.get("202508"), Some(&1));
}

#[tokio::test]
async fn test_test_mode_stops_after_limit_without_writing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_landing(&server, &[("AAAS", "African American Studies")]).await;
    let courses: String = ["AAAS100", "AAAS101", "AAAS200", "AAAS201", "AAAS300"]
        .iter()
        .map(|id| course_block(id, "Topic", None))
        .collect();
    mount_listing(&server, TERM, "AAAS", format!("<html><body>{}</body></html>", courses)).await;

    // Only the first three courses get their sections fetched
    Mock::given(method("GET"))
        .and(path(format!("/soc/{}/sections", TERM)))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(3)
        .mount(&server)
        .await;

    let mut scraper = create_scraper(create_test_config(&server, dir.path()), NoSyllabi);
    scraper.scrape_test(None, None).await.unwrap();

    let stats = scraper.stats();
    assert_eq!(stats.total_courses, 3);
    assert_eq!(stats.successful_courses, 3);
    assert_eq!(stats.failed_courses, 0);
    assert_eq!(json_files(dir.path()), 0);
}

#[tokio::test]
async fn test_unknown_department() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_landing(&server, &[("CMSC", "Computer Science")]).await;

    let mut scraper = create_scraper(create_test_config(&server, dir.path()), NoSyllabi);
    let result = scraper.scrape_department("ZZZZ", Some(TERM)).await;

    assert!(matches!(result, Err(ScrapeError::UnknownDepartment(id)) if id == "ZZZZ"));
    assert_eq!(scraper.stats().departments_processed, 0);
}

#[tokio::test]
async fn test_discovery_failure_is_fatal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/soc/"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let mut scraper = create_scraper(create_test_config(&server, dir.path()), NoSyllabi);
    let result = scraper.scrape_full(None).await;

    match result {
        Err(ScrapeError::Exhausted {
            operation,
            attempts,
            ..
        }) => {
            assert_eq!(operation, "get_terms");
            assert_eq!(attempts, 3);
        }
        other => panic!("Expected exhausted retries, got {:?}", other),
    }
}

/// Syllabus source answering from a fixed table and counting lookups
#[derive(Clone)]
struct CountingSyllabi {
    calls: Arc<AtomicUsize>,
}

impl SyllabusSource for CountingSyllabi {
    async fn extract_syllabi_for_department(
        &self,
        department_url: &str,
    ) -> Result<SyllabusMap, ScrapeError> {
        assert!(department_url.ends_with("/soc/202508/CMSC"));
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut map = SyllabusMap::new();
        map.insert("CMSC131".to_string(), Some("Fall 2024".to_string()));
        map.insert("CMSC216".to_string(), None);
        Ok(map)
    }
}

#[tokio::test]
async fn test_syllabus_lookup_cached_per_department() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_landing(&server, &[("CMSC", "Computer Science")]).await;
    let listing = format!(
        "<html><body>{}{}{}</body></html>",
        course_block("CMSC131", "Object-Oriented Programming I", Some(2)),
        course_block("CMSC216", "Introduction to Computer Systems", Some(1)),
        course_block("CMSC250", "Discrete Structures", None)
    );
    mount_listing(&server, TERM, "CMSC", listing).await;
    mount_empty_sections(&server).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let source = CountingSyllabi {
        calls: Arc::clone(&calls),
    };

    let mut config = create_test_config(&server, dir.path());
    config.scraper.extract_syllabi = true;
    let mut scraper = create_scraper(config, source);
    scraper.scrape_department("CMSC", Some(TERM)).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let storage = scraper.storage();
    let cmsc131 = storage.load_course(TERM, "CMSC131").unwrap();
    assert_eq!(cmsc131.syllabus_count, 2);
    assert_eq!(cmsc131.most_recent_syllabus.as_deref(), Some("Fall 2024"));

    let cmsc216 = storage.load_course(TERM, "CMSC216").unwrap();
    assert_eq!(cmsc216.syllabus_count, 1);
    assert_eq!(cmsc216.most_recent_syllabus, None);

    let cmsc250 = storage.load_course(TERM, "CMSC250").unwrap();
    assert_eq!(cmsc250.syllabus_count, 0);
    assert_eq!(cmsc250.most_recent_syllabus, None);
}

#[tokio::test]
async fn test_syllabus_source_skipped_when_disabled() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_landing(&server, &[("CMSC", "Computer Science")]).await;
    mount_listing(
        &server,
        TERM,
        "CMSC",
        format!(
            "<html><body>{}</body></html>",
            course_block("CMSC131", "Object-Oriented Programming I", Some(2))
        ),
    )
    .await;
    mount_empty_sections(&server).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let source = CountingSyllabi {
        calls: Arc::clone(&calls),
    };

    let mut scraper = create_scraper(create_test_config(&server, dir.path()), source);
    scraper.scrape_department("CMSC", Some(TERM)).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let course = scraper.storage().load_course(TERM, "CMSC131").unwrap();
    assert_eq!(course.syllabus_count, 2);
    assert_eq!(course.most_recent_syllabus, None);
}

/// Syllabus source whose browser never comes up
struct FailingSyllabi {
    calls: Arc<AtomicUsize>,
}

impl SyllabusSource for FailingSyllabi {
    async fn extract_syllabi_for_department(
        &self,
        _department_url: &str,
    ) -> Result<SyllabusMap, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ScrapeError::Syllabus("browser unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_syllabus_failure_leaves_courses_unenriched() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_landing(&server, &[("CMSC", "Computer Science")]).await;
    let listing = format!(
        "<html><body>{}{}</body></html>",
        course_block("CMSC131", "Object-Oriented Programming I", Some(2)),
        course_block("CMSC216", "Introduction to Computer Systems", Some(1))
    );
    mount_listing(&server, TERM, "CMSC", listing).await;
    mount_empty_sections(&server).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let source = FailingSyllabi {
        calls: Arc::clone(&calls),
    };

    let mut config = create_test_config(&server, dir.path());
    config.scraper.extract_syllabi = true;
    let mut scraper = create_scraper(config, source);
    scraper
        .scrape_department("CMSC", Some(TERM))
        .await
        .expect("Syllabus failures should not end the run");

    // The failure is cached, so the second badged course does not retry it
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(scraper.stats().successful_courses, 2);
    assert_eq!(scraper.stats().failed_courses, 0);

    for id in ["CMSC131", "CMSC216"] {
        let course = scraper.storage().load_course(TERM, id).unwrap();
        assert!(course.syllabus_count > 0);
        assert_eq!(course.most_recent_syllabus, None);
    }
}

#[tokio::test]
async fn test_write_failure_counts_courses_as_failed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // A regular file where the corpus directory should be
    let blocker = dir.path().join("corpus");
    std::fs::write(&blocker, "not a directory").unwrap();

    mount_landing(&server, &[("CMSC", "Computer Science")]).await;
    let listing = format!(
        "<html><body>{}{}</body></html>",
        course_block("CMSC131", "Object-Oriented Programming I", None),
        course_block("CMSC216", "Introduction to Computer Systems", None)
    );
    mount_listing(&server, TERM, "CMSC", listing).await;
    mount_empty_sections(&server).await;

    let mut scraper = create_scraper(create_test_config(&server, &blocker), NoSyllabi);
    scraper
        .scrape_department("CMSC", Some(TERM))
        .await
        .expect("Write failures should not end the run");

    let stats = scraper.stats();
    assert_eq!(stats.total_courses, 2);
    assert_eq!(stats.successful_courses, 0);
    assert_eq!(stats.failed_courses, 2);
    assert_eq!(stats.departments_processed, 1);
    assert!(blocker.is_file());
}

#[tokio::test]
async fn test_scrape_entry_point() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_landing(&server, &[("CMSC", "Computer Science")]).await;
    mount_listing(
        &server,
        TERM,
        "CMSC",
        format!(
            "<html><body>{}</body></html>",
            course_block("CMSC131", "Object-Oriented Programming I", None)
        ),
    )
    .await;
    mount_empty_sections(&server).await;

    let mut config = create_test_config(&server, dir.path());
    config.retry.discovery.base_delay = 0.0;
    config.retry.sections.base_delay = 0.0;

    let stats = scrape(config, &ScrapeMode::Department("CMSC".to_string()), Some(TERM))
        .await
        .unwrap();

    assert_eq!(stats.total_courses, 1);
    assert_eq!(stats.successful_courses, 1);
    assert!((stats.success_rate() - 100.0).abs() < f64::EPSILON);
}
