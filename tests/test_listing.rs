mod common;

use common::TempTree;
use warden::files::listing::render_listing;
use warden::files::{list_directory, Entry, ServedRoot};
use warden::limits::AccessCounter;

fn served(tree: &TempTree) -> ServedRoot {
    ServedRoot::new(tree.path(), [".html", ".htm", ".pdf", ".png"]).unwrap()
}

#[tokio::test]
async fn test_list_directory_is_sorted_and_marks_directories() {
    let tree = TempTree::new();
    tree.file("b.html", b"").file("a.pdf", b"").dir("z");

    let entries = list_directory(tree.path()).await.unwrap();

    assert_eq!(
        entries,
        vec![
            Entry { name: "a.pdf".into(), is_dir: false },
            Entry { name: "b.html".into(), is_dir: false },
            Entry { name: "z".into(), is_dir: true },
        ]
    );
}

#[tokio::test]
async fn test_listing_orders_directories_then_allowed_files() {
    let tree = TempTree::new();
    tree.file("b.html", b"")
        .file("a.pdf", b"")
        .file("c.txt", b"")
        .dir("z")
        .dir("m");
    let root = served(&tree);
    let counter = AccessCounter::synchronized();

    let html = render_listing(&root, root.path(), &counter).await.unwrap();

    let m = html.find("href=\"/m/\"").unwrap();
    let z = html.find("href=\"/z/\"").unwrap();
    let a = html.find("href=\"/a.pdf\"").unwrap();
    let b = html.find("href=\"/b.html\"").unwrap();
    assert!(m < z && z < a && a < b, "{}", html);

    assert!(html.contains(">z/</a>"));
    assert!(!html.contains("c.txt"));
}

#[tokio::test]
async fn test_root_listing_has_no_parent_link() {
    let tree = TempTree::new();
    tree.file("index.html", b"");
    let root = served(&tree);

    let html = render_listing(&root, root.path(), &AccessCounter::synchronized())
        .await
        .unwrap();

    assert!(html.contains("<h2>Index of [0]/</h2>"));
    assert!(!html.contains("../"));
}

#[tokio::test]
async fn test_nested_listing_links_back_to_parent() {
    let tree = TempTree::new();
    tree.file("docs/guides/intro.html", b"");
    let root = served(&tree);
    let dir = root.path().join("docs").join("guides");

    let html = render_listing(&root, &dir, &AccessCounter::synchronized())
        .await
        .unwrap();

    assert!(html.contains("<h2>Index of [0]/docs/guides</h2>"));
    assert!(html.contains("<a href=\"/docs\">../</a>"));
    assert!(html.contains("href=\"/docs/guides/intro.html\""));
}

#[tokio::test]
async fn test_listing_shows_hit_counts() {
    let tree = TempTree::new();
    tree.file("a.html", b"").dir("sub");
    let root = served(&tree);
    let counter = AccessCounter::synchronized();

    counter.hit(root.path()).await;
    counter.hit(&root.path().join("a.html")).await;
    counter.hit(&root.path().join("a.html")).await;
    counter.hit(&root.path().join("sub")).await;

    let html = render_listing(&root, root.path(), &counter).await.unwrap();

    assert!(html.contains("Index of [1]/"));
    assert!(html.contains("<li>[2] <a href=\"/a.html\">a.html</a></li>"));
    assert!(html.contains("<li>[1]<b><a href=\"/sub/\">sub/</a></b></li>"));
}

#[tokio::test]
async fn test_listing_encodes_hrefs() {
    let tree = TempTree::new();
    tree.file("my report.pdf", b"");
    let root = served(&tree);

    let html = render_listing(&root, root.path(), &AccessCounter::synchronized())
        .await
        .unwrap();

    assert!(html.contains("href=\"/my%20report.pdf\">my report.pdf</a>"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_dangling_symlink_is_not_listed() {
    let tree = TempTree::new();
    tree.file("real.html", b"");
    std::os::unix::fs::symlink(tree.path().join("gone.html"), tree.path().join("broken.html")).unwrap();
    let root = served(&tree);

    let entries = list_directory(tree.path()).await.unwrap();
    assert_eq!(entries, vec![Entry { name: "real.html".into(), is_dir: false }]);

    let html = render_listing(&root, root.path(), &AccessCounter::synchronized())
        .await
        .unwrap();
    assert!(!html.contains("broken.html"), "{}", html);
}

#[tokio::test]
async fn test_listing_escapes_entry_names() {
    let tree = TempTree::new();
    tree.file("a&b.html", b"");
    let root = served(&tree);

    let html = render_listing(&root, root.path(), &AccessCounter::synchronized())
        .await
        .unwrap();

    assert!(html.contains("<li>[0] <a href=\"/a%26b.html\">a&amp;b.html</a></li>"), "{}", html);
}
