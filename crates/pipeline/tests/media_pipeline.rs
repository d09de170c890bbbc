//! End-to-end pipeline tests over a real content tree on disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use mediamark_core::tree::{JsxValue, Node};
use mediamark_pipeline::{
    DedupeMode, DocumentInput, JsonFileStore, MediaConfig, MediaPipeline, MemoryStore,
};

/// A valid 100x80 grayscale PNG.
const PNG_100X80: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x64, 0x00, 0x00, 0x00, 0x50, 0x08, 0x00, 0x00, 0x00, 0x00, 0xca, 0x62, 0x8f,
    0x33, 0x00, 0x00, 0x00, 0xa1, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0xed, 0xcd, 0x85, 0x41, 0x42,
    0x01, 0x00, 0x40, 0xc1, 0xaf, 0x80, 0x80, 0x4a, 0x77, 0x77, 0x77, 0x83, 0xd2, 0x21, 0x92, 0x92,
    0x52, 0x82, 0xc4, 0xfe, 0x3b, 0x30, 0x08, 0xef, 0x16, 0x38, 0x41, 0x78, 0x7a, 0x16, 0x89, 0x25,
    0x2f, 0x52, 0x99, 0xfc, 0xf5, 0xed, 0x5d, 0xa1, 0x54, 0xa9, 0x35, 0x5a, 0x9d, 0xde, 0x60, 0x34,
    0x99, 0x2d, 0x56, 0x9b, 0xdd, 0xe1, 0x74, 0xb9, 0x3d, 0x5e, 0x9f, 0x3f, 0x10, 0x0c, 0x85, 0x23,
    0xd1, 0x58, 0x3c, 0x91, 0x4c, 0xa5, 0x33, 0xd9, 0x5c, 0xbe, 0x50, 0x2c, 0x95, 0x2b, 0x1f, 0x9f,
    0xd5, 0x5a, 0xbd, 0xd1, 0x6c, 0xb5, 0x3b, 0xdd, 0xde, 0x57, 0xff, 0x7b, 0x30, 0x1c, 0x8d, 0x27,
    0xd3, 0x9f, 0xd9, 0x7c, 0xb1, 0x5c, 0xad, 0x7f, 0x37, 0xdb, 0xdd, 0xfe, 0xf0, 0x77, 0x3c, 0xfd,
    0x9f, 0x2f, 0xd7, 0x9b, 0x40, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42,
    0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42,
    0x42, 0x42, 0xf2, 0x58, 0xc9, 0x1d, 0x98, 0x35, 0x0b, 0x3b, 0xa0, 0xba, 0xf3, 0x3d, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// SHA-1 of `PNG_100X80`.
const PNG_SHA1: &str = "900fcaeca28e2d367d81d4011a1f4b43727a0b8f";

fn pipeline_with_store(root: &Path) -> (MediaPipeline, MemoryStore) {
    let store = MemoryStore::new();
    let config = MediaConfig {
        output_root: root.join("public"),
        ..MediaConfig::default()
    };
    (MediaPipeline::new(config, Box::new(store.clone())), store)
}

fn first_image(tree: &Node) -> &mediamark_core::tree::ImageNode {
    fn walk<'a>(node: &'a Node) -> Option<&'a mediamark_core::tree::ImageNode> {
        if let Node::Image(img) = node {
            return Some(img);
        }
        node.children()?.iter().find_map(walk)
    }
    walk(tree).expect("no image node in tree")
}

fn first_html(tree: &Node) -> &str {
    fn walk(node: &Node) -> Option<&str> {
        if let Node::Html(html) = node {
            return Some(html);
        }
        node.children()?.iter().find_map(walk)
    }
    walk(tree).expect("no html node in tree")
}

#[test]
fn legacy_image_with_attr_block_localizes_and_expands() {
    let dir = tempfile::tempdir().unwrap();
    let posts = dir.path().join("src/content/posts");
    fs::create_dir_all(&posts).unwrap();
    fs::write(posts.join("cat.png"), PNG_100X80).unwrap();

    let (pipeline, store) = pipeline_with_store(dir.path());
    let doc = pipeline
        .process_source(
            posts.join("scenario.md"),
            "![](cat.png){.rounded style=\"border:1px\"}\n",
        )
        .unwrap();

    let img = first_image(&doc.tree);
    assert_eq!(img.url, format!("/assets/hash/{}.png", PNG_SHA1));
    assert_eq!(img.alt, "cat");
    assert_eq!(img.hints.classes, vec!["rounded"]);
    assert_eq!(img.hints.style, "border:1px");
    assert_eq!(img.hints.extra("width"), Some("100"));
    assert_eq!(img.hints.extra("height"), Some("80"));

    // The trailing attribute block never reaches the renderer.
    let Node::Root(root) = &doc.tree else {
        panic!("root expected");
    };
    let Node::Paragraph(para) = &root.children[0] else {
        panic!("paragraph expected");
    };
    assert_eq!(para.children.len(), 1);

    // One copy on disk, one ledger entry.
    let copied = dir
        .path()
        .join("public/assets/hash")
        .join(format!("{}.png", PNG_SHA1));
    assert!(copied.exists());
    assert_eq!(fs::read(&copied).unwrap(), PNG_100X80);

    let ledger = store.snapshot();
    assert_eq!(ledger.len(), 1);
    let entry = ledger.get(PNG_SHA1).unwrap();
    assert_eq!(entry.ext, ".png");
    assert_eq!(entry.path, img.url);
}

#[test]
fn global_dedupe_collapses_identical_bytes_across_documents() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("src/content/a");
    let b = dir.path().join("src/content/b");
    fs::create_dir_all(&a).unwrap();
    fs::create_dir_all(&b).unwrap();
    // Different names, identical bytes.
    fs::write(a.join("one.png"), PNG_100X80).unwrap();
    fs::write(b.join("two.png"), PNG_100X80).unwrap();

    let (pipeline, store) = pipeline_with_store(dir.path());
    let doc_a = pipeline
        .process_source(a.join("post.md"), "![](one.png)\n")
        .unwrap();
    let doc_b = pipeline
        .process_source(b.join("post.md"), "![](two.png)\n")
        .unwrap();

    let url_a = &first_image(&doc_a.tree).url;
    let url_b = &first_image(&doc_b.tree).url;
    assert_eq!(url_a, url_b);

    let hash_dir = dir.path().join("public/assets/hash");
    assert_eq!(fs::read_dir(&hash_dir).unwrap().count(), 1);
    assert_eq!(store.snapshot().len(), 1);
}

#[test]
fn per_post_mode_isolates_documents() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("src/content/alpha");
    let b = dir.path().join("src/content/beta");
    fs::create_dir_all(&a).unwrap();
    fs::create_dir_all(&b).unwrap();
    fs::write(a.join("img.png"), PNG_100X80).unwrap();
    fs::write(b.join("img.png"), PNG_100X80).unwrap();

    let store = MemoryStore::new();
    let config = MediaConfig {
        dedupe_mode: DedupeMode::PerPost,
        output_root: dir.path().join("public"),
        ..MediaConfig::default()
    };
    let pipeline = MediaPipeline::new(config, Box::new(store));

    let doc_a = pipeline
        .process_source(a.join("post.md"), "![](img.png)\n")
        .unwrap();
    let doc_b = pipeline
        .process_source(b.join("post.md"), "![](img.png)\n")
        .unwrap();

    let url_a = &first_image(&doc_a.tree).url;
    let url_b = &first_image(&doc_b.tree).url;
    assert_ne!(url_a, url_b);
    assert!(url_a.contains("/alpha/post/"), "got {}", url_a);
    assert!(url_b.contains("/beta/post/"), "got {}", url_b);
}

#[test]
fn repeated_runs_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let posts = dir.path().join("src/content/posts");
    fs::create_dir_all(&posts).unwrap();
    fs::write(posts.join("cat.png"), PNG_100X80).unwrap();

    let (pipeline, store) = pipeline_with_store(dir.path());
    for _ in 0..3 {
        pipeline
            .process_source(posts.join("p.md"), "![](cat.png)\n")
            .unwrap();
    }

    let hash_dir = dir.path().join("public/assets/hash");
    assert_eq!(fs::read_dir(&hash_dir).unwrap().count(), 1);
    assert_eq!(store.snapshot().len(), 1);
}

#[test]
fn local_video_localizes_and_renders_markup() {
    let dir = tempfile::tempdir().unwrap();
    let posts = dir.path().join("src/content/posts");
    fs::create_dir_all(&posts).unwrap();
    fs::write(posts.join("clip.mp4"), b"fake mp4 payload").unwrap();

    let (pipeline, store) = pipeline_with_store(dir.path());
    let doc = pipeline
        .process_source(posts.join("v.md"), "![](clip.mp4)\n")
        .unwrap();

    let html = first_html(&doc.tree);
    assert!(
        html.starts_with("<video controls playsinline muted>"),
        "{}",
        html
    );
    assert!(html.contains("type=\"video/mp4\""));
    assert!(html.contains("/assets/hash/"));
    assert!(html.contains("Your browser does not support the video tag."));

    let ledger = store.snapshot();
    assert_eq!(ledger.len(), 1);
    let (_, entry) = ledger.iter().next().unwrap();
    assert_eq!(entry.ext, ".mp4");
}

#[test]
fn remote_references_pass_through_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, store) = pipeline_with_store(dir.path());

    let doc = pipeline
        .process_source(
            dir.path().join("p.md"),
            "![ext](https://example.com/x.png)\n\n![rooted](/assets/x.png)\n",
        )
        .unwrap();

    let Node::Root(root) = &doc.tree else {
        panic!("root expected");
    };
    let urls: Vec<&str> = root
        .children
        .iter()
        .filter_map(|n| n.children())
        .flatten()
        .filter_map(|n| match n {
            Node::Image(img) => Some(img.url.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(urls, vec!["https://example.com/x.png", "/assets/x.png"]);
    assert!(store.snapshot().is_empty());
    assert!(!dir.path().join("public").exists());
}

#[test]
fn frontmatter_image_and_body_share_one_asset() {
    let dir = tempfile::tempdir().unwrap();
    let posts = dir.path().join("src/content/posts");
    fs::create_dir_all(&posts).unwrap();
    fs::write(posts.join("cover.png"), PNG_100X80).unwrap();

    let (pipeline, store) = pipeline_with_store(dir.path());
    let doc = pipeline
        .process_source(
            posts.join("p.md"),
            "---\ntitle: Post\nimage: cover.png\n---\n\n![](cover.png)\n",
        )
        .unwrap();

    let expected = format!("/assets/hash/{}.png", PNG_SHA1);
    assert_eq!(
        doc.frontmatter.get("image").and_then(|v| v.as_str()),
        Some(expected.as_str())
    );
    assert_eq!(first_image(&doc.tree).url, expected);
    assert_eq!(store.snapshot().len(), 1);
}

#[test]
fn mdx_jsx_media_component_gets_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let posts = dir.path().join("src/content/posts");
    fs::create_dir_all(&posts).unwrap();
    fs::write(posts.join("img.png"), PNG_100X80).unwrap();

    let (pipeline, _) = pipeline_with_store(dir.path());
    let doc = pipeline
        .process_source(posts.join("p.mdx"), "<Media src=\"img.png\" />\n")
        .unwrap();

    let Node::Root(root) = &doc.tree else {
        panic!("root expected");
    };
    let Node::Jsx(jsx) = &root.children[0] else {
        panic!("jsx expected, got {:?}", root.children[0]);
    };

    let src = jsx.attribute("src").unwrap();
    let Some(JsxValue::Literal(url)) = &src.value else {
        panic!("literal src expected");
    };
    assert_eq!(url, &format!("/assets/hash/{}.png", PNG_SHA1));

    let width = jsx.attribute("width").unwrap();
    assert_eq!(width.value, Some(JsxValue::Literal("100".to_string())));
    let height = jsx.attribute("height").unwrap();
    assert_eq!(height.value, Some(JsxValue::Literal("80".to_string())));
}

#[test]
fn mdx_shorthand_preprocessed_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let posts = dir.path().join("src/content/posts");
    fs::create_dir_all(&posts).unwrap();
    fs::write(posts.join("cat.png"), PNG_100X80).unwrap();

    let (pipeline, _) = pipeline_with_store(dir.path());
    let doc = pipeline
        .process_source(
            posts.join("p.mdx"),
            "![A cat](cat.png){.rounded style=\"border:1px\"}\n",
        )
        .unwrap();

    let img = first_image(&doc.tree);
    assert_eq!(img.url, format!("/assets/hash/{}.png", PNG_SHA1));
    assert_eq!(img.alt, "A cat");
    assert_eq!(img.hints.classes, vec!["rounded"]);
    assert_eq!(img.hints.style, "border:1px");
}

#[test]
fn json_file_store_persists_between_pipelines() {
    let dir = tempfile::tempdir().unwrap();
    let posts = dir.path().join("src/content/posts");
    fs::create_dir_all(&posts).unwrap();
    fs::write(posts.join("cat.png"), PNG_100X80).unwrap();
    let ledger_path = dir.path().join(".asset-usage.json");

    let config = MediaConfig {
        output_root: dir.path().join("public"),
        usage_log_path: ledger_path.clone(),
        ..MediaConfig::default()
    };

    {
        let pipeline = MediaPipeline::new(
            config.clone(),
            Box::new(JsonFileStore::new(&ledger_path)),
        );
        pipeline
            .process_source(posts.join("p.md"), "![](cat.png)\n")
            .unwrap();
    }

    let raw = fs::read_to_string(&ledger_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(json.get(PNG_SHA1).is_some(), "ledger keyed by hash: {}", raw);

    // A fresh pipeline sees the persisted entry.
    let pipeline = MediaPipeline::new(config, Box::new(JsonFileStore::new(&ledger_path)));
    assert_eq!(pipeline.ledger_snapshot().len(), 1);
}

#[test]
fn batch_processing_shares_the_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let posts = dir.path().join("src/content/posts");
    fs::create_dir_all(&posts).unwrap();
    fs::write(posts.join("cat.png"), PNG_100X80).unwrap();

    let (pipeline, store) = pipeline_with_store(dir.path());
    let inputs: Vec<DocumentInput> = (0..4)
        .map(|i| DocumentInput {
            path: posts.join(format!("p{}.md", i)),
            source: "![](cat.png)\n".to_string(),
        })
        .collect();

    let (results, stats) = pipeline.process_batch(inputs);
    assert_eq!(stats.total, 4);
    assert_eq!(stats.succeeded, 4);
    assert!(results.iter().all(|r| r.result.is_ok()));

    // Identical bytes everywhere: one copy, one ledger entry.
    let hash_dir = dir.path().join("public/assets/hash");
    assert_eq!(fs::read_dir(&hash_dir).unwrap().count(), 1);
    assert_eq!(store.snapshot().len(), 1);
}

#[test]
fn custom_post_id_shapes_per_post_paths() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("cat.png"), PNG_100X80).unwrap();

    let config = MediaConfig {
        dedupe_mode: DedupeMode::PerPost,
        output_root: dir.path().join("public"),
        ..MediaConfig::default()
    };
    let pipeline = MediaPipeline::new(config, Box::new(MemoryStore::new()))
        .with_post_id(Arc::new(|path| {
            format!("slugged/{}", path.file_stem().unwrap().to_string_lossy())
        }));

    let doc = pipeline
        .process_source(dir.path().join("hello.md"), "![](cat.png)\n")
        .unwrap();
    assert!(
        first_image(&doc.tree)
            .url
            .starts_with("/assets/images/slugged/hello/"),
        "got {}",
        first_image(&doc.tree).url
    );
}
