use integration_tests::{fixture, ids, reply, root, Fixture};
use rf_core::{AppError, ErrorKind, PageRequest, Related, SortMode};

async fn thread_posts(service: &rf_core::ForumService, thread: &str) -> Vec<rf_core::Post> {
    service
        .get_posts(thread, PageRequest::default())
        .await
        .expect("listing posts")
}

#[tokio::test]
async fn batch_shares_timestamp_and_gets_increasing_ids() {
    let Fixture { service, .. } = fixture().await;

    let created = service
        .create_posts("borrowck", vec![root("alice", "a"), root("bob", "b"), root("carol", "c")])
        .await
        .unwrap();

    assert_eq!(created.len(), 3);
    assert!(created.windows(2).all(|w| w[0].id < w[1].id));
    assert!(created.iter().all(|p| p.created == created[0].created));
    assert!(created.iter().all(|p| p.thread == 1 && p.forum == "rust"));
    assert!(created.iter().all(|p| !p.is_edited));
}

#[tokio::test]
async fn failing_last_element_leaves_nothing_behind() {
    let Fixture { service, .. } = fixture().await;

    let err = service
        .create_posts(
            "1",
            vec![root("alice", "first"), root("bob", "second"), root("nobody", "third")],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AuthorNotFound(ref n) if n == "nobody"));
    assert_eq!(err.kind(), ErrorKind::ReferenceViolation);
    assert!(thread_posts(&service, "1").await.is_empty());
}

#[tokio::test]
async fn reply_path_extends_parent_path() {
    let Fixture { service, .. } = fixture().await;

    let r = service.create_posts("1", vec![root("alice", "root")]).await.unwrap();
    let children = service
        .create_posts("1", vec![reply("bob", r[0].id, "c1"), reply("carol", r[0].id, "c2")])
        .await
        .unwrap();
    let grand = service
        .create_posts("1", vec![reply("alice", children[0].id, "g")])
        .await
        .unwrap();

    for child in &children {
        assert_eq!(child.path, r[0].path.child(child.id));
    }
    assert_eq!(grand[0].path, children[0].path.child(grand[0].id));
    assert!(children[0].path < children[1].path);

    let stored = service.get_post(grand[0].id).await.unwrap();
    assert_eq!(stored.path, grand[0].path);
    assert_eq!(stored.parent, children[0].id);
}

#[tokio::test]
async fn parent_from_other_forum_is_rejected_and_nothing_inserted() {
    let Fixture { service, .. } = fixture().await;

    let go_post = service
        .create_posts("goroutines", vec![root("bob", "channels")])
        .await
        .unwrap();
    let err = service
        .create_posts(
            "borrowck",
            vec![root("alice", "fine on its own"), reply("alice", go_post[0].id, "stale parent")],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::CrossThreadParent { thread: 1, .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(thread_posts(&service, "borrowck").await.is_empty());
}

#[tokio::test]
async fn parent_from_sibling_thread_of_same_forum_is_rejected() {
    let Fixture { service, .. } = fixture().await;

    // Threads 1 and 3 both live in `rust`.
    let other = service.create_posts("3", vec![root("alice", "elsewhere")]).await.unwrap();
    let err = service
        .create_posts("1", vec![reply("bob", other[0].id, "wrong thread")])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::CrossThreadParent { .. }));
}

#[tokio::test]
async fn unknown_parent_is_reported() {
    let Fixture { service, .. } = fixture().await;

    let err = service
        .create_posts("1", vec![reply("alice", 4242, "orphan")])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ParentNotFound(4242)));
}

#[tokio::test]
async fn thread_misses_distinguish_slug_from_id() {
    let Fixture { service, .. } = fixture().await;

    let by_slug = service.create_posts("no-such-thread", vec![root("alice", "x")]).await;
    let by_id = service.create_posts("999", vec![root("alice", "x")]).await;

    assert!(matches!(by_slug, Err(AppError::ThreadNotFoundBySlug(_))));
    assert!(matches!(by_id, Err(AppError::ThreadNotFoundById(999))));
}

#[tokio::test]
async fn empty_batch_succeeds() {
    let Fixture { service, .. } = fixture().await;
    assert!(service.create_posts("1", Vec::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn edited_flag_reflects_real_changes_only() {
    let Fixture { service, .. } = fixture().await;
    let post = service
        .create_posts("1", vec![root("alice", "original")])
        .await
        .unwrap()
        .remove(0);

    for _ in 0..2 {
        let same = service.update_post(post.id, "original").await.unwrap();
        assert!(!same.is_edited);
    }

    let empty = service.update_post(post.id, "").await.unwrap();
    assert_eq!(empty.message, "original");
    assert!(!empty.is_edited);

    let changed = service.update_post(post.id, "rewritten").await.unwrap();
    assert_eq!(changed.message, "rewritten");
    assert!(changed.is_edited);

    let repeated = service.update_post(post.id, "rewritten").await.unwrap();
    assert!(repeated.is_edited);

    assert!(matches!(
        service.update_post(post.id + 100, "x").await,
        Err(AppError::PostNotFound(_))
    ));
}

#[tokio::test]
async fn post_details_attach_requested_entities() {
    let Fixture { service, .. } = fixture().await;
    let post = service
        .create_posts("borrowck", vec![root("BOB", "shouting")])
        .await
        .unwrap()
        .remove(0);
    assert_eq!(post.author, "bob");

    let bare = service.post_details(post.id, &[]).await.unwrap();
    assert!(bare.author.is_none() && bare.thread.is_none());

    let full = service
        .post_details(post.id, &Related::parse_list("user,thread,forum"))
        .await
        .unwrap();
    assert_eq!(full.author.unwrap().nickname, "bob");
    assert_eq!(full.thread.unwrap().slug.as_deref(), Some("borrowck"));

    let json = serde_json::to_value(service.get_post(post.id).await.unwrap()).unwrap();
    assert_eq!(json["thread"], serde_json::json!(1));
    assert_eq!(json["isEdited"], serde_json::json!(false));
}

#[tokio::test]
async fn posts_in_other_threads_stay_out_of_pages() {
    let Fixture { service, .. } = fixture().await;
    service.create_posts("2", vec![root("bob", "go")]).await.unwrap();
    let mine = service.create_posts("1", vec![root("alice", "rust")]).await.unwrap();

    for sort in [SortMode::Flat, SortMode::Tree, SortMode::ParentTree] {
        let page = service
            .get_posts("1", PageRequest { sort, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(ids(&page), ids(&mine));
    }
}
