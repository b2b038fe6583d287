use futures::TryStreamExt as _;
use sqlx::Executor;
use yamdb_dal::{
    Error, ListingParams,
    category::{CategoryRepositoryImpl, CreateCategory},
    genre::{CreateGenre, GenreRepositoryImpl},
    comment::{CommentRepositoryImpl, CreateComment, PatchComment, ReviewRef},
    review::{CreateReview, PatchReview, ReviewRepositoryImpl},
    title::{CreateTitle, PatchTitle, TitleFilter, TitleRepositoryImpl},
    user::{CreateUser, UserChanges, UserRepositoryImpl},
};
use yamdb_types::claim::Role;

const TEST_DATA: &str = r#"
INSERT INTO users (id, username, email, role, verification_nonce, created)
VALUES (1, 'alice', 'alice@example.com', 'user', 'n1', datetime());
INSERT INTO users (id, username, email, role, verification_nonce, created)
VALUES (2, 'bob', 'bob@example.com', 'user', 'n2', datetime());
INSERT INTO users (id, username, email, role, verification_nonce, created)
VALUES (3, 'mod', 'mod@example.com', 'moderator', 'n3', datetime());

INSERT INTO category (id, name, slug) VALUES (1, 'Films', 'film');
INSERT INTO category (id, name, slug) VALUES (2, 'Books', 'book');

INSERT INTO genre (id, name, slug) VALUES (1, 'Drama', 'drama');
INSERT INTO genre (id, name, slug) VALUES (2, 'Sci-Fi', 'sci-fi');

INSERT INTO title (id, name, year, description, category_id) VALUES (1, 'Solaris', 1972, '', 1);
INSERT INTO title (id, name, year, description, category_id) VALUES (2, 'Stalker', 1979, '', 1);
INSERT INTO title_genres (title_id, genre_id) VALUES (1, 1);
INSERT INTO title_genres (title_id, genre_id) VALUES (1, 2);
"#;

async fn init_db() -> sqlx::Pool<sqlx::Sqlite> {
    const DB_URL: &str = "sqlite::memory:";
    let conn = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect(DB_URL)
        .await
        .unwrap();
    conn.execute("PRAGMA foreign_keys = ON").await.unwrap();
    yamdb_dal::MIGRATOR.run(&conn).await.unwrap();

    conn.execute_many(TEST_DATA)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    conn
}

fn review(score: i64) -> CreateReview {
    CreateReview {
        text: "Worth watching".to_string(),
        score,
    }
}

#[tokio::test]
async fn test_rating_is_average_of_scores() {
    let conn = init_db().await;
    let titles = TitleRepositoryImpl::new(conn.clone());
    let reviews = ReviewRepositoryImpl::new(conn);

    let title = titles.get(1).await.unwrap();
    assert_eq!(title.rating, 0.0);
    assert_eq!(title.genre.len(), 2);
    assert_eq!(title.category.as_ref().unwrap().slug, "film");

    reviews.create(1, 1, review(8)).await.unwrap();
    reviews.create(1, 2, review(10)).await.unwrap();

    let title = titles.get(1).await.unwrap();
    assert_eq!(title.rating, 9.0);

    let listing = titles
        .list(ListingParams::new(0, 10), &TitleFilter::default())
        .await
        .unwrap();
    assert_eq!(listing.total, 2);
    let other = listing.rows.iter().find(|t| t.id == 2).unwrap();
    assert_eq!(other.rating, 0.0);
    assert!(other.genre.is_empty());
}

#[tokio::test]
async fn test_duplicate_review_rejected() {
    let conn = init_db().await;
    let reviews = ReviewRepositoryImpl::new(conn);

    reviews.create(1, 1, review(5)).await.unwrap();
    let res = reviews.create(1, 1, review(7)).await;
    assert!(matches!(res, Err(Error::DuplicateReview)));

    // other title is fine
    reviews.create(2, 1, review(7)).await.unwrap();

    let listing = reviews.list(1, ListingParams::default()).await.unwrap();
    assert_eq!(listing.total, 1);
    assert_eq!(listing.rows[0].score, 5);
    assert_eq!(listing.rows[0].author, "alice");
}

#[tokio::test]
async fn test_concurrent_reviews_one_success() {
    let conn = init_db().await;
    let reviews = ReviewRepositoryImpl::new(conn);

    let (a, b) = futures::join!(
        reviews.create(1, 2, review(3)),
        reviews.create(1, 2, review(4))
    );
    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(Error::DuplicateReview)))
    );
}

#[tokio::test]
async fn test_unique_index_rejects_second_review() {
    let conn = init_db().await;
    let reviews = ReviewRepositoryImpl::new(conn);

    reviews.insert(1, 2, review(3)).await.unwrap();
    let res = reviews.insert(1, 2, review(4)).await;
    assert!(matches!(res, Err(Error::DuplicateReview)));

    let listing = reviews.list(1, ListingParams::default()).await.unwrap();
    assert_eq!(listing.total, 1);
    assert_eq!(listing.rows[0].score, 3);
}

#[tokio::test]
async fn test_name_search_treats_wildcards_literally() {
    let conn = init_db().await;
    let categories = CategoryRepositoryImpl::new(conn.clone());
    let genres = GenreRepositoryImpl::new(conn.clone());
    let titles = TitleRepositoryImpl::new(conn);

    for search in ["%", "_"] {
        let found = categories
            .list(ListingParams::default(), Some(search))
            .await
            .unwrap();
        assert_eq!(found.total, 0, "category search {search}");
        assert!(found.rows.is_empty());

        let filter = TitleFilter {
            name: Some(search.to_string()),
            ..Default::default()
        };
        let listing = titles.list(ListingParams::default(), &filter).await.unwrap();
        assert_eq!(listing.total, 0, "title search {search}");
    }

    genres
        .create(CreateGenre {
            name: "100% Noir".to_string(),
            slug: "noir".to_string(),
        })
        .await
        .unwrap();
    let found = genres
        .list(ListingParams::default(), Some("0% n"))
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.rows[0].slug, "noir");
    let found = genres
        .list(ListingParams::default(), Some("%"))
        .await
        .unwrap();
    assert_eq!(found.total, 1);
}

#[tokio::test]
async fn test_review_update_keeps_author() {
    let conn = init_db().await;
    let reviews = ReviewRepositoryImpl::new(conn);

    let created = reviews.create(1, 1, review(5)).await.unwrap();
    let updated = reviews
        .update(
            1,
            created.id,
            PatchReview {
                score: Some(9),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.score, 9);
    assert_eq!(updated.text, created.text);
    assert_eq!(updated.author_id, 1);
    assert_eq!(updated.pub_date, created.pub_date);

    let res = reviews.get(2, created.id).await;
    assert!(matches!(res, Err(Error::RecordNotFound(_))));
}

#[tokio::test]
async fn test_comments_scoped_by_review_and_title() {
    let conn = init_db().await;
    let reviews = ReviewRepositoryImpl::new(conn.clone());
    let comments = CommentRepositoryImpl::new(conn.clone());

    let r = reviews.create(1, 1, review(6)).await.unwrap();
    let scope = ReviewRef {
        title_id: 1,
        review_id: r.id,
    };
    let c = comments
        .create(
            scope,
            2,
            CreateComment {
                text: "Disagree".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(c.author, "bob");

    let wrong_scope = ReviewRef {
        title_id: 2,
        review_id: r.id,
    };
    assert!(matches!(
        comments.get(wrong_scope, c.id).await,
        Err(Error::RecordNotFound(_))
    ));
    assert!(matches!(
        comments.delete(wrong_scope, c.id).await,
        Err(Error::RecordNotFound(_))
    ));

    let updated = comments
        .update(
            scope,
            c.id,
            PatchComment {
                text: Some("Agree".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.text, "Agree");

    // deleting the review removes its comments
    reviews.delete(1, r.id).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT count(*) FROM comment")
        .fetch_one(&conn)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_title_create_and_update() {
    let conn = init_db().await;
    let titles = TitleRepositoryImpl::new(conn.clone());

    let created = titles
        .create(CreateTitle {
            name: "Dune".to_string(),
            year: 1965,
            description: None,
            genre: vec!["sci-fi".to_string()],
            category: Some("book".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(created.genre[0].slug, "sci-fi");
    assert_eq!(created.category.as_ref().unwrap().name, "Books");
    assert_eq!(created.rating, 0.0);

    let res = titles
        .create(CreateTitle {
            name: "Nothing".to_string(),
            year: 2000,
            description: None,
            genre: vec!["unknown".to_string()],
            category: None,
        })
        .await;
    assert!(matches!(res, Err(Error::UnknownReference { .. })));

    let patched = titles
        .update(
            created.id,
            PatchTitle {
                name: Some("Dune Messiah".to_string()),
                ..Default::default()
            }
            .into(),
        )
        .await
        .unwrap();
    assert_eq!(patched.name, "Dune Messiah");
    assert_eq!(patched.year, 1965);
    assert_eq!(patched.genre.len(), 1);

    let replaced = titles
        .update(
            created.id,
            CreateTitle {
                name: "Dune".to_string(),
                year: 1965,
                description: Some("Desert planet".to_string()),
                genre: vec!["drama".to_string(), "sci-fi".to_string()],
                category: None,
            }
            .into(),
        )
        .await
        .unwrap();
    assert!(replaced.category.is_none());
    assert_eq!(replaced.genre.len(), 2);

    let filter = TitleFilter {
        genre: Some("drama".to_string()),
        ..Default::default()
    };
    let listing = titles.list(ListingParams::default(), &filter).await.unwrap();
    assert_eq!(listing.total, 2);

    let filter = TitleFilter {
        name: Some("stalk".to_string()),
        ..Default::default()
    };
    let listing = titles.list(ListingParams::default(), &filter).await.unwrap();
    assert_eq!(listing.rows.len(), 1);
    assert_eq!(listing.rows[0].name, "Stalker");
}

#[tokio::test]
async fn test_category_delete_nulls_title() {
    let conn = init_db().await;
    let categories = CategoryRepositoryImpl::new(conn.clone());
    let titles = TitleRepositoryImpl::new(conn);

    let created = categories
        .create(CreateCategory {
            name: "Music".to_string(),
            slug: "music".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(created.slug, "music");
    let res = categories
        .create(CreateCategory {
            name: "Music again".to_string(),
            slug: "music".to_string(),
        })
        .await;
    assert!(matches!(res, Err(Error::UniqueViolation(_))));

    let found = categories
        .list(ListingParams::default(), Some("oo"))
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.rows[0].slug, "book");

    categories.delete("film").await.unwrap();
    let title = titles.get(1).await.unwrap();
    assert!(title.category.is_none());
    assert!(matches!(
        categories.delete("film").await,
        Err(Error::RecordNotFound(_))
    ));
}

#[tokio::test]
async fn test_user_identity_and_confirmation() {
    let conn = init_db().await;
    let users = UserRepositoryImpl::new(conn);

    let conflicts = users
        .conflicts(Some("ALICE"), Some("new@example.com"), None)
        .await
        .unwrap();
    assert!(conflicts.username);
    assert!(!conflicts.email);

    let conflicts = users
        .conflicts(Some("alice"), Some("alice@example.com"), Some(1))
        .await
        .unwrap();
    assert!(!conflicts.any());

    let created = users
        .create(CreateUser::signup(
            "carol".to_string(),
            "carol@example.com".parse().unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(created.role, Role::User);
    assert!(!created.confirmed);

    let res = users
        .create(CreateUser::signup(
            "Carol".to_string(),
            "other@example.com".parse().unwrap(),
        ))
        .await;
    assert!(matches!(res, Err(Error::UniqueViolation(_))));

    let identity = users
        .find_identity("carol", "carol@example.com")
        .await
        .unwrap();
    assert_eq!(identity.map(|u| u.id), Some(created.id));

    let state = users.verification_state("carol").await.unwrap();
    assert!(users.confirm(state.id, &state.verification_nonce).await.unwrap());
    assert!(!users.confirm(state.id, &state.verification_nonce).await.unwrap());
    let user = users.get(created.id).await.unwrap();
    assert!(user.confirmed);
}

#[tokio::test]
async fn test_user_update_and_list() {
    let conn = init_db().await;
    let users = UserRepositoryImpl::new(conn);

    let updated = users
        .update(
            2,
            UserChanges {
                bio: Some("Film buff".to_string()),
                role: Some(Role::Moderator),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.bio, "Film buff");
    assert_eq!(updated.role, Role::Moderator);
    assert_eq!(updated.email, "bob@example.com");

    let listing = users
        .list(ListingParams::new(0, 2), None)
        .await
        .unwrap();
    assert_eq!(listing.total, 3);
    assert_eq!(listing.rows.len(), 2);

    let listing = users
        .list(ListingParams::default(), Some("mod"))
        .await
        .unwrap();
    assert_eq!(listing.rows.len(), 1);

    users.delete(3).await.unwrap();
    assert!(matches!(
        users.find_by_username("mod").await,
        Err(Error::RecordNotFound(_))
    ));
}
