//! End-to-end inspection scenarios over real files, with byte-exact
//! assertions on the canonical output form.

mod common;

use archi_inspector::inspect::Inspector;
use archi_inspector::resolver::{Content, DiffOutcome, ResolverRegistry};
use common::{write_entity, MockResolver};
use std::sync::Arc;

fn build_inspector(scheme: &str, resolver: MockResolver) -> (Inspector, Arc<MockResolver>) {
    let resolver = Arc::new(resolver);
    let mut registry = ResolverRegistry::new();
    registry.register(scheme, resolver.clone());
    (Inspector::new(registry), resolver)
}

#[tokio::test]
async fn minimal_entity_is_left_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let file = write_entity(tmp.path(), "entity.xml", "<root/>");
    let before = std::fs::read_to_string(&file).unwrap();

    let (inspector, _) = build_inspector("someproto", MockResolver::default());
    let changed = inspector.inspect_file(&file).await.unwrap();

    assert!(!changed);
    assert_eq!(std::fs::read_to_string(&file).unwrap(), before);
}

#[tokio::test]
async fn locked_entity_is_skipped_and_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let file = write_entity(
        tmp.path(),
        "entity.xml",
        r#"<root>
            <properties key="pwrt:inspector:value-deps" value="someproto://some.host/f.ext@a1b2c3d4#L1"/>
            <properties key="pwrt:inspector:value-requires-reviewing" value="true"/>
        </root>"#,
    );
    let before = std::fs::read_to_string(&file).unwrap();

    let (inspector, resolver) = build_inspector("someproto", MockResolver::versioning());
    let changed = inspector.inspect_file(&file).await.unwrap();

    assert!(!changed);
    assert_eq!(std::fs::read_to_string(&file).unwrap(), before);
    assert!(resolver.diff_calls.lock().unwrap().is_empty());
    assert!(resolver.resolve_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unpinned_dep_first_inspection_writes_hash_and_review_flag() {
    let tmp = tempfile::tempdir().unwrap();
    let file = write_entity(
        tmp.path(),
        "entity.xml",
        r#"<root>
            <properties key="pwrt:inspector:value-deps" value="someproto://some.host/some/path/file.ext#L1"/>
        </root>"#,
    );

    let (inspector, _) = build_inspector(
        "someproto",
        MockResolver::plain("someproto://some.host/some/path/file.ext#L1", b"fakecontent"),
    );
    let changed = inspector.inspect_file(&file).await.unwrap();

    assert!(changed);
    assert_eq!(
        std::fs::read_to_string(&file).unwrap(),
        r#"<root>
  <properties
      key="pwrt:inspector:value-deps"
      value="someproto://some.host/some/path/file.ext#L1"/>
  <properties
      key="pwrt:inspector:value-deps-hashes"
      value="d5683b61"/>
  <properties
      key="pwrt:inspector:value-requires-reviewing"
      value="true"/>
</root>
"#
    );
}

#[tokio::test]
async fn pinned_dep_lines_moved_advances_pin_without_review() {
    let tmp = tempfile::tempdir().unwrap();
    let file = write_entity(
        tmp.path(),
        "entity.xml",
        r#"<root>
            <properties key="pwrt:inspector:value-deps" value="someproto://some.host/some/path/file.ext@a1b2c3d4#L1"/>
        </root>"#,
    );

    let (inspector, _) = build_inspector(
        "someproto",
        MockResolver::versioning().with_diff(
            "someproto://some.host/some/path/file.ext@a1b2c3d4#L1",
            Some(DiffOutcome::LinesMoved {
                updated_url: "someproto://some.host/some/path/file.ext@a1b2c3d5#L2".to_string(),
                current_lines_content: Some("fakecontent".to_string()),
            }),
        ),
    );
    let changed = inspector.inspect_file(&file).await.unwrap();

    assert!(changed);
    assert_eq!(
        std::fs::read_to_string(&file).unwrap(),
        r#"<root>
  <properties
      key="pwrt:inspector:value-deps"
      value="someproto://some.host/some/path/file.ext@a1b2c3d5#L2"/>
</root>
"#
    );
}

#[tokio::test]
async fn pinned_dep_content_changed_flags_review() {
    let tmp = tempfile::tempdir().unwrap();
    let file = write_entity(
        tmp.path(),
        "entity.xml",
        r#"<root>
            <properties key="pwrt:inspector:value-deps" value="someproto://some.host/some/path/file.ext@a1b2c3d4#L2-4"/>
        </root>"#,
    );

    let (inspector, _) = build_inspector(
        "someproto",
        MockResolver::versioning().with_diff(
            "someproto://some.host/some/path/file.ext@a1b2c3d4#L2-4",
            Some(DiffOutcome::ContentChanged {
                updated_url: "someproto://some.host/some/path/file.ext@a1b2c3d5#L3-5".to_string(),
                current_lines_content: Some("line2 changed\nline3\nline4".to_string()),
                was_lines_content: Some("line2\nline3\nline4".to_string()),
            }),
        ),
    );
    let changed = inspector.inspect_file(&file).await.unwrap();

    assert!(changed);
    assert_eq!(
        std::fs::read_to_string(&file).unwrap(),
        r#"<root>
  <properties
      key="pwrt:inspector:value-deps"
      value="someproto://some.host/some/path/file.ext@a1b2c3d5#L3-5"/>
  <properties
      key="pwrt:inspector:value-requires-reviewing"
      value="true"/>
</root>
"#
    );
}

#[tokio::test]
async fn mixed_plugin_deps_combine_hashes_and_pins() {
    let tmp = tempfile::tempdir().unwrap();
    let file = write_entity(
        tmp.path(),
        "entity.xml",
        r#"<root>
            <properties key="pwrt:inspector:value-deps"
              value="proto1://some.host/file1.ext#L1;proto2://some.host/file2.ext@a1b2c3d4#L1;proto1://some.host/file3.ext#L2"/>
        </root>"#,
    );

    let resolver1 = Arc::new(
        MockResolver::plain("proto1://some.host/file1.ext#L1", b"fakecontent").with_content(
            "proto1://some.host/file3.ext#L2",
            Some(Content::Plain {
                content: Some(b"fakecontent".to_vec()),
            }),
        ),
    );
    let resolver2 = Arc::new(MockResolver::versioning().with_diff(
        "proto2://some.host/file2.ext@a1b2c3d4#L1",
        Some(DiffOutcome::ContentChanged {
            updated_url: "proto2://some.host/file2.ext@a1b2c3d5#L2".to_string(),
            current_lines_content: Some("line1 changed".to_string()),
            was_lines_content: Some("line1".to_string()),
        }),
    ));
    let mut registry = ResolverRegistry::new();
    registry.register("proto1", resolver1.clone());
    registry.register("proto2", resolver2);
    let inspector = Inspector::new(registry);

    let changed = inspector.inspect_file(&file).await.unwrap();

    assert!(changed);
    assert_eq!(
        std::fs::read_to_string(&file).unwrap(),
        r#"<root>
  <properties
      key="pwrt:inspector:value-deps"
      value="proto1://some.host/file1.ext#L1;proto2://some.host/file2.ext@a1b2c3d5#L2;proto1://some.host/file3.ext#L2"/>
  <properties
      key="pwrt:inspector:value-deps-hashes"
      value="d5683b61;;d5683b61"/>
  <properties
      key="pwrt:inspector:value-requires-reviewing"
      value="true"/>
</root>
"#
    );
    assert_eq!(
        resolver1.resolve_calls.lock().unwrap().as_slice(),
        [
            "proto1://some.host/file1.ext#L1",
            "proto1://some.host/file3.ext#L2"
        ]
    );
}

#[tokio::test]
async fn pinned_value_ref_content_change_extracts_value() {
    let tmp = tempfile::tempdir().unwrap();
    let file = write_entity(
        tmp.path(),
        "entity.xml",
        r#"<root>
            <properties key="pwrt:inspector:value" value="knownvalue"/>
            <properties key="pwrt:inspector:value-ref" value="someproto://some.host/some/path/file.ext@a1b2c3d4#L1"/>
            <properties key="pwrt:inspector:value-regexp" value="123([a-z]+)456"/>
        </root>"#,
    );

    let (inspector, _) = build_inspector(
        "someproto",
        MockResolver::versioning().with_diff(
            "someproto://some.host/some/path/file.ext@a1b2c3d4#L1",
            Some(DiffOutcome::ContentChanged {
                updated_url: "someproto://some.host/some/path/file.ext@a1b2c3d5#L2".to_string(),
                current_lines_content: Some("xyz123newvalue456abc".to_string()),
                was_lines_content: Some("xyz123oldvalue456abc".to_string()),
            }),
        ),
    );
    let changed = inspector.inspect_file(&file).await.unwrap();

    assert!(changed);
    assert_eq!(
        std::fs::read_to_string(&file).unwrap(),
        r#"<root>
  <properties
      key="pwrt:inspector:value"
      value="knownvalue"/>
  <properties
      key="pwrt:inspector:value-new"
      value="newvalue"/>
  <properties
      key="pwrt:inspector:value-ref"
      value="someproto://some.host/some/path/file.ext@a1b2c3d5#L2"/>
  <properties
      key="pwrt:inspector:value-regexp"
      value="123([a-z]+)456"/>
  <properties
      key="pwrt:inspector:value-requires-reviewing"
      value="true"/>
</root>
"#
    );
}

#[tokio::test]
async fn unpinned_value_ref_regexp_miss_records_sentinel() {
    let tmp = tempfile::tempdir().unwrap();
    let file = write_entity(
        tmp.path(),
        "entity.xml",
        r#"<root>
            <properties key="pwrt:inspector:value" value="knownvalue"/>
            <properties key="pwrt:inspector:value-ref" value="someproto://some.host/some/path/file.ext#L1"/>
            <properties key="pwrt:inspector:value-regexp" value="aaa(.+)bbb"/>
        </root>"#,
    );

    let (inspector, _) = build_inspector(
        "someproto",
        MockResolver::plain(
            "someproto://some.host/some/path/file.ext#L1",
            b"thisshouldnotmatch",
        ),
    );
    let changed = inspector.inspect_file(&file).await.unwrap();

    assert!(changed);
    assert_eq!(
        std::fs::read_to_string(&file).unwrap(),
        r#"<root>
  <properties
      key="pwrt:inspector:value"
      value="knownvalue"/>
  <properties
      key="pwrt:inspector:value-new"
      value="~none~"/>
  <properties
      key="pwrt:inspector:value-ref"
      value="someproto://some.host/some/path/file.ext#L1"/>
  <properties
      key="pwrt:inspector:value-regexp"
      value="aaa(.+)bbb"/>
  <properties
      key="pwrt:inspector:value-requires-reviewing"
      value="true"/>
</root>
"#
    );
}

#[tokio::test]
async fn archimate_entity_keeps_its_namespace_form() {
    let tmp = tempfile::tempdir().unwrap();
    let file = write_entity(
        tmp.path(),
        "entity.xml",
        r#"<archimate:ApplicationComponent
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xmlns:archimate="http://www.archimatetool.com/archimate"
    id="id-a1b2c3d4"
    name="Some Component">
  <properties
      key="pwrt:inspector:value-deps"
      value="someproto://some.host/f.ext#L1"/>
</archimate:ApplicationComponent>
"#,
    );

    let (inspector, _) = build_inspector(
        "someproto",
        MockResolver::plain("someproto://some.host/f.ext#L1", b"fakecontent"),
    );
    let changed = inspector.inspect_file(&file).await.unwrap();

    assert!(changed);
    assert_eq!(
        std::fs::read_to_string(&file).unwrap(),
        r#"<archimate:ApplicationComponent
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xmlns:archimate="http://www.archimatetool.com/archimate"
    id="id-a1b2c3d4"
    name="Some Component">
  <properties
      key="pwrt:inspector:value-deps"
      value="someproto://some.host/f.ext#L1"/>
  <properties
      key="pwrt:inspector:value-deps-hashes"
      value="d5683b61"/>
  <properties
      key="pwrt:inspector:value-requires-reviewing"
      value="true"/>
</archimate:ApplicationComponent>
"#
    );
}

#[tokio::test]
async fn second_inspection_after_drift_is_a_noop() {
    // First pass detects drift and locks the entity; the lock must make the
    // second pass a no-op without consulting resolvers.
    let tmp = tempfile::tempdir().unwrap();
    let file = write_entity(
        tmp.path(),
        "entity.xml",
        r#"<root>
            <properties key="pwrt:inspector:value-deps" value="someproto://some.host/f.ext#L1"/>
        </root>"#,
    );

    let (inspector, _) = build_inspector(
        "someproto",
        MockResolver::plain("someproto://some.host/f.ext#L1", b"fakecontent"),
    );
    assert!(inspector.inspect_file(&file).await.unwrap());
    let after_first = std::fs::read_to_string(&file).unwrap();

    let (inspector, resolver) = build_inspector(
        "someproto",
        MockResolver::plain("someproto://some.host/f.ext#L1", b"fakecontent"),
    );
    assert!(!inspector.inspect_file(&file).await.unwrap());
    assert_eq!(std::fs::read_to_string(&file).unwrap(), after_first);
    assert!(resolver.resolve_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn second_inspection_after_pin_advance_is_a_noop() {
    // A pure pin advance does not lock the entity; idempotence comes from
    // the new pin diffing clean on the next run.
    let tmp = tempfile::tempdir().unwrap();
    let file = write_entity(
        tmp.path(),
        "entity.xml",
        r#"<root>
            <properties key="pwrt:inspector:value-deps" value="someproto://some.host/f.ext@a1b2c3d4#L1"/>
        </root>"#,
    );

    let (inspector, _) = build_inspector(
        "someproto",
        MockResolver::versioning().with_diff(
            "someproto://some.host/f.ext@a1b2c3d4#L1",
            Some(DiffOutcome::LinesMoved {
                updated_url: "someproto://some.host/f.ext@a1b2c3d5#L2".to_string(),
                current_lines_content: Some("fakecontent".to_string()),
            }),
        ),
    );
    assert!(inspector.inspect_file(&file).await.unwrap());

    let (inspector, _) = build_inspector(
        "someproto",
        MockResolver::versioning().with_diff(
            "someproto://some.host/f.ext@a1b2c3d5#L2",
            Some(DiffOutcome::NoChange),
        ),
    );
    let after_first = std::fs::read_to_string(&file).unwrap();
    assert!(!inspector.inspect_file(&file).await.unwrap());
    assert_eq!(std::fs::read_to_string(&file).unwrap(), after_first);
}

#[tokio::test]
async fn hash_count_matches_dep_count_after_write() {
    let tmp = tempfile::tempdir().unwrap();
    let file = write_entity(
        tmp.path(),
        "entity.xml",
        r#"<root>
            <properties key="pwrt:inspector:value-deps"
              value="proto1://h/a.ext#L1;proto1://h/b.ext#L1"/>
        </root>"#,
    );

    let resolver = Arc::new(
        MockResolver::plain("proto1://h/a.ext#L1", b"aaa").with_content(
            "proto1://h/b.ext#L1",
            Some(Content::Plain {
                content: Some(b"bbb".to_vec()),
            }),
        ),
    );
    let mut registry = ResolverRegistry::new();
    registry.register("proto1", resolver);
    let inspector = Inspector::new(registry);

    assert!(inspector.inspect_file(&file).await.unwrap());

    let written = std::fs::read_to_string(&file).unwrap();
    let entity = archi_inspector::model::Entity::parse_str(&written, "test").unwrap();
    let deps = entity
        .property("pwrt:inspector:value-deps")
        .unwrap()
        .split(';')
        .count();
    let hashes = entity
        .property("pwrt:inspector:value-deps-hashes")
        .unwrap()
        .split(';')
        .count();
    assert_eq!(deps, hashes);
}

#[tokio::test]
async fn writer_output_is_stable_under_reinspection_write() {
    // Canonical ordering fixed point: writing the engine's own output again
    // produces identical bytes.
    let tmp = tempfile::tempdir().unwrap();
    let file = write_entity(
        tmp.path(),
        "entity.xml",
        r#"<root>
            <properties key="zzz" value="keep"/>
            <properties key="pwrt:inspector:value-deps" value="someproto://h/f.ext#L1"/>
            <bounds x="120" y="88"/>
        </root>"#,
    );

    let (inspector, _) = build_inspector(
        "someproto",
        MockResolver::plain("someproto://h/f.ext#L1", b"fakecontent"),
    );
    assert!(inspector.inspect_file(&file).await.unwrap());
    let written = std::fs::read_to_string(&file).unwrap();

    let entity = archi_inspector::model::Entity::parse_str(&written, "test").unwrap();
    assert_eq!(entity.to_canonical_string(), written);
    // opaque children survive
    assert!(written.contains("<bounds"));
    assert!(written.contains("key=\"zzz\""));
}
