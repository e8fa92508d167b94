//! Extraction strategy chain: embedded blob first, `og:*` meta tags second.

use insta_unfurl::extract::embedded::{media_record, Edge, Node, ShortcodeMedia, Sidecar};
use insta_unfurl::extract::Extractor;
use insta_unfurl::AppError;

const POST_URL: &str = "https://www.instagram.com/p/ABC/";

fn page_with_blob(blob: &str) -> String {
    format!(
        "<html><head>\n<title>\nAlice on Instagram: \"sunset\"\n• Instagram photos</title>\n\
         <meta property=\"og:image\" content=\"https://cdn.example/og.jpg\" />\n\
         </head><body>\
         <script type=\"text/javascript\">window.__additionalDataLoaded('/p/ABC/',{blob});</script>\
         </body></html>"
    )
}

fn sidecar_blob() -> String {
    r#"{"graphql":{"shortcode_media":{
        "display_url":"https://cdn.example/top.jpg",
        "is_video":false,
        "owner":{"username":"alice","profile_pic_url":"https://cdn.example/alice.jpg"},
        "edge_sidecar_to_children":{"edges":[
            {"node":{"display_url":"https://cdn.example/1.jpg","is_video":false}},
            {"node":{"display_url":"https://cdn.example/2.jpg","is_video":true}},
            {"node":{"display_url":"https://cdn.example/3.jpg","is_video":false}}
        ]}
    }}}"#
        .replace(['\n', ' '], "")
}

fn three_children() -> ShortcodeMedia {
    let child = |url: &str, is_video: bool| Edge {
        node: Node {
            display_url: url.into(),
            is_video,
        },
    };
    ShortcodeMedia {
        display_url: "https://cdn.example/top.jpg".into(),
        is_video: false,
        edge_sidecar_to_children: Some(Sidecar {
            edges: vec![
                child("https://cdn.example/1.jpg", false),
                child("https://cdn.example/2.jpg", true),
                child("https://cdn.example/3.jpg", false),
            ],
        }),
        owner: None,
    }
}

#[test]
fn single_video_post_has_one_part() {
    let media = ShortcodeMedia {
        display_url: "https://cdn.example/v.jpg".into(),
        is_video: true,
        ..ShortcodeMedia::default()
    };

    for selected_index in [0, 2, -1] {
        let record = media_record(&media, "T".into(), POST_URL, selected_index);

        assert_eq!(record.part_count, 1);
        assert!(record.is_video);
        assert_eq!(record.image_url, "https://cdn.example/v.jpg");
        assert!(!record.is_multi_part());
    }
}

#[test]
fn selected_child_supplies_image_and_video_flag() {
    let record = media_record(&three_children(), "T".into(), POST_URL, 1);

    assert_eq!(record.part_count, 3);
    assert_eq!(record.image_url, "https://cdn.example/2.jpg");
    assert!(record.is_video);
}

#[test]
fn out_of_range_selector_falls_back_to_post() {
    let record = media_record(&three_children(), "T".into(), POST_URL, 5);

    assert_eq!(record.part_count, 3);
    assert_eq!(record.image_url, "https://cdn.example/top.jpg");
    assert!(!record.is_video);
}

#[test]
fn negative_selector_falls_back_to_post() {
    let record = media_record(&three_children(), "T".into(), POST_URL, -1);

    assert_eq!(record.image_url, "https://cdn.example/top.jpg");
    assert_eq!(record.part_count, 3);
}

#[test]
fn empty_sidecar_still_counts_one_part() {
    let media = ShortcodeMedia {
        display_url: "https://cdn.example/top.jpg".into(),
        edge_sidecar_to_children: Some(Sidecar { edges: Vec::new() }),
        ..ShortcodeMedia::default()
    };

    let record = media_record(&media, String::new(), POST_URL, 0);
    assert_eq!(record.part_count, 1);
}

#[test]
fn embedded_blob_wins_over_meta_tags() {
    let extractor = Extractor::new().expect("patterns compile");
    let page = page_with_blob(&sidecar_blob());

    let record = extractor
        .extract(page.as_bytes(), POST_URL, 2)
        .expect("metadata found");

    assert_eq!(record.title, "Alice on Instagram: \"sunset\"");
    assert_eq!(record.canonical_url, POST_URL);
    assert_eq!(record.image_url, "https://cdn.example/3.jpg");
    assert_eq!(record.part_count, 3);
    assert_eq!(record.owner_username.as_deref(), Some("alice"));
    assert_eq!(
        record.owner_avatar_url.as_deref(),
        Some("https://cdn.example/alice.jpg")
    );
}

#[test]
fn malformed_blob_falls_back_to_meta_tags() {
    let extractor = Extractor::new().expect("patterns compile");
    let page = page_with_blob(r#"{"graphql":{"shortcode_media":{"display_url":"#);

    let record = extractor
        .extract(page.as_bytes(), POST_URL, 1)
        .expect("metadata found");

    assert_eq!(record.image_url, "https://cdn.example/og.jpg");
    assert_eq!(record.part_count, 1);
    assert_eq!(record.title, "Alice on Instagram: \"sunset\"");
    assert_eq!(record.canonical_url, POST_URL);
    assert!(record.owner_username.is_none());
}

#[test]
fn null_leaf_values_keep_the_embedded_record() {
    let extractor = Extractor::new().expect("patterns compile");
    let blob = r#"{"graphql":{"shortcode_media":{
        "display_url":null,
        "is_video":null,
        "owner":{"username":"a","profile_pic_url":null},
        "edge_sidecar_to_children":{"edges":[
            {"node":{"display_url":"https://1.jpg","is_video":null}},
            {"node":null}
        ]}
    }}}"#
        .replace(['\n', ' '], "");
    let page = page_with_blob(&blob);

    let record = extractor
        .extract(page.as_bytes(), POST_URL, 0)
        .expect("metadata found");

    assert_eq!(record.image_url, "https://1.jpg");
    assert!(!record.is_video);
    assert_eq!(record.part_count, 2);
    assert_eq!(record.owner_username.as_deref(), Some("a"));
    assert!(record.owner_avatar_url.is_none());
}

#[test]
fn meta_tags_supply_title_url_and_video_marker() {
    let extractor = Extractor::new().expect("patterns compile");
    let page = "<html><head>\
        <meta property=\"og:title\" content=\"Bob on Instagram\" />\
        <meta property=\"og:url\" content=\"https://www.instagram.com/p/XYZ/\" />\
        <meta property=\"og:image\" content=\"https://cdn.example/bob.jpg\" />\
        <meta property=\"og:video\" content=\"https://cdn.example/bob.mp4\" />\
        </head></html>";

    let record = extractor
        .extract(page.as_bytes(), "https://www.instagram.com/p/XYZ/?igshid=1", 0)
        .expect("metadata found");

    assert_eq!(record.title, "Bob on Instagram");
    assert_eq!(record.canonical_url, "https://www.instagram.com/p/XYZ/");
    assert_eq!(record.image_url, "https://cdn.example/bob.jpg");
    assert!(record.is_video);
}

#[test]
fn meta_tags_without_image_are_not_enough() {
    let extractor = Extractor::new().expect("patterns compile");
    let page = "<title>Login • Instagram</title>\
        <meta property=\"og:title\" content=\"Login\" />";

    let err = extractor
        .extract(page.as_bytes(), POST_URL, 0)
        .expect_err("no metadata");

    assert!(matches!(err, AppError::NoMetadataFound(ref msg) if msg.contains(POST_URL)));
    assert!(err.to_string().contains("no og:image"));
}

#[test]
fn non_utf8_bytes_do_not_abort_extraction() {
    let extractor = Extractor::new().expect("patterns compile");
    let mut page = b"<title>caf\xe9</title>".to_vec();
    page.extend_from_slice(b"<meta property=\"og:image\" content=\"https://cdn.example/c.jpg\" />");

    let record = extractor
        .extract(&page, POST_URL, 0)
        .expect("metadata found");
    assert_eq!(record.image_url, "https://cdn.example/c.jpg");
    assert!(record.title.starts_with("caf"));
}
