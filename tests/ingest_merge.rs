// tests/ingest_merge.rs
//
// Pure merge stage: concatenation order, title cleanup, first-wins dedup,
// date fallback and the stable chronological sort. No network involved.

use chrono::{DateTime, Utc};
use tech_events_feed::config::FeedConfig;
use tech_events_feed::ingest::dates::DEFAULT_TIMEZONE;
use tech_events_feed::ingest::types::RawEvent;
use tech_events_feed::ingest::{merge_events, render_payload};

fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid rfc3339 in test")
        .with_timezone(&Utc)
}

fn now() -> DateTime<Utc> {
    utc("2025-09-01T12:00:00Z")
}

fn seed_fallback() -> Vec<RawEvent> {
    FeedConfig::default_seed().fallback_events()
}

#[test]
fn fallback_only_is_sorted_chronologically() {
    let out = merge_events(Vec::new(), &seed_fallback(), now(), DEFAULT_TIMEZONE);
    let titles: Vec<_> = out.events.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "HarborHack 2025",
            "Charleston Tech Happy Hour",
            "Blue Sky Demo Day"
        ]
    );
    assert_eq!(out.events[0].start_date, utc("2025-10-03T12:00:00Z"));
    assert_eq!(out.events[1].start_date, utc("2025-11-15T22:00:00Z"));
    assert_eq!(out.events[2].start_date, utc("2026-02-14T14:00:00Z"));
}

#[test]
fn live_record_wins_over_fallback_with_same_cleaned_title() {
    let live = vec![vec![RawEvent::titled("HarborHack 2025 ")
        .with_start("Oct 3, 2025")
        .with_location("Charleston, SC")
        .with_link("https://www.charlestondigital.com/events")]];
    let out = merge_events(live, &seed_fallback(), now(), DEFAULT_TIMEZONE);

    let harbor: Vec<_> = out
        .events
        .iter()
        .filter(|e| e.title == "HarborHack 2025")
        .collect();
    assert_eq!(harbor.len(), 1);
    assert_eq!(harbor[0].location, "Charleston, SC");
    assert_eq!(harbor[0].start_date, utc("2025-10-03T04:00:00Z"));
    assert_eq!(out.duplicates, 1);
    assert_eq!(out.events.len(), 3);
}

#[test]
fn dedup_is_exact_after_cleanup() {
    let live = vec![vec![
        RawEvent::titled("Code &amp; Coffee").with_start("2025-11-01"),
        RawEvent::titled("<b>Code & Coffee</b>").with_start("2025-11-02"),
        RawEvent::titled("code & coffee").with_start("2025-11-03"),
    ]];
    let out = merge_events(live, &[], now(), DEFAULT_TIMEZONE);
    // case differs, so the third one is a distinct title
    assert_eq!(out.events.len(), 2);
    assert_eq!(out.events[0].title, "Code & Coffee");
    assert_eq!(out.events[0].start_date, utc("2025-11-01T04:00:00Z"));
    assert_eq!(out.events[1].title, "code & coffee");
}

#[test]
fn equal_instants_keep_concatenation_order() {
    let same = "2025-11-20T23:00:00Z";
    let per_source = vec![
        vec![RawEvent::titled("From first source").with_start(same)],
        vec![
            RawEvent::titled("From second source").with_start(same),
            RawEvent::titled("Earlier").with_start("2025-11-20T18:00:00Z"),
        ],
    ];
    let fallback = vec![RawEvent::titled("From fallback").with_start(same)];
    let out = merge_events(per_source, &fallback, now(), DEFAULT_TIMEZONE);
    let titles: Vec<_> = out.events.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Earlier",
            "From first source",
            "From second source",
            "From fallback"
        ]
    );
}

#[test]
fn unparseable_date_becomes_retrieval_time_and_untitled_is_dropped() {
    let live = vec![vec![
        RawEvent::titled("Mystery Mixer").with_start("Date coming soon"),
        RawEvent::titled("No date at all"),
        RawEvent::default().with_start("2025-11-01"),
        RawEvent::titled(" <span> </span> "),
    ]];
    let out = merge_events(live, &[], now(), DEFAULT_TIMEZONE);
    assert_eq!(out.events.len(), 2);
    assert_eq!(out.untitled, 2);
    assert_eq!(out.date_fallbacks, 2);
    assert!(out.events.iter().all(|e| e.start_date == now()));
}

#[test]
fn payload_shape_is_events_array_with_camel_case_fields() {
    let out = merge_events(Vec::new(), &seed_fallback(), now(), DEFAULT_TIMEZONE);
    let payload = render_payload(&out.events).expect("render");

    let v: serde_json::Value = serde_json::from_str(&payload).expect("valid json");
    let events = v["events"].as_array().expect("events array");
    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["title"], "HarborHack 2025");
    assert_eq!(events[0]["startDate"], "2025-10-03T12:00:00.000Z");
    assert_eq!(events[0]["location"], "Charleston Tech Center");
    assert_eq!(events[0]["link"], "https://charlestonhacks.com/hackathon");

    // two-space indentation
    assert!(payload.starts_with("{\n  \"events\": [\n    {"), "{payload}");
}

#[test]
fn empty_merge_renders_empty_list() {
    let out = merge_events(vec![Vec::new(), Vec::new()], &[], now(), DEFAULT_TIMEZONE);
    assert!(out.events.is_empty());
    let v: serde_json::Value =
        serde_json::from_str(&render_payload(&out.events).expect("render")).expect("json");
    assert_eq!(v, serde_json::json!({ "events": [] }));
}
