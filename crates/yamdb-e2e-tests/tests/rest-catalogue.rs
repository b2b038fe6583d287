use serde_json::{Value, json};
use tracing::info;
use tracing_test::traced_test;
use yamdb_e2e_tests::{
    TestUser, launch_env, login_as, prepare_env,
    rest::{create_category, create_genre, create_title, failure, seed_catalogue, title_url},
};

#[tokio::test]
#[traced_test]
async fn test_catalogue_admin_only() {
    let (args, _config_guard) = prepare_env("test_catalogue_admin_only").await.unwrap();
    let (admin, api) = launch_env(args.clone(), TestUser::Admin).await.unwrap();
    let user = login_as(&args, TestUser::User).await.unwrap();
    let moderator = login_as(&args, TestUser::Moderator).await.unwrap();
    let anonymous = login_as(&args, TestUser::Anonymous).await.unwrap();

    create_category(&admin, &api, "Book", "book").await.unwrap();

    for client in [&user, &moderator] {
        let response = client
            .post(api.join("genres").unwrap())
            .json(&json!({"name": "Drama", "slug": "drama"}))
            .send()
            .await
            .unwrap();
        let err = failure(response).await.unwrap();
        assert_eq!(err.status, 403);
        assert_eq!(err.code, "permission_denied");
    }

    let response = anonymous
        .delete(api.join("categories/book").unwrap())
        .send()
        .await
        .unwrap();
    let err = failure(response).await.unwrap();
    assert_eq!(err.status, 403);
    assert_eq!(err.code, "not_authenticated");

    // reading is public
    let response = anonymous
        .get(api.join("categories").unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let page: Value = response.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["rows"][0]["slug"], "book");

    let response = admin
        .delete(api.join("categories/book").unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
}

#[tokio::test]
#[traced_test]
async fn test_duplicate_slug() {
    let (args, _config_guard) = prepare_env("test_duplicate_slug").await.unwrap();
    let (admin, api) = launch_env(args, TestUser::Admin).await.unwrap();

    create_genre(&admin, &api, "Drama", "drama").await.unwrap();
    let response = admin
        .post(api.join("genres").unwrap())
        .json(&json!({"name": "Another drama", "slug": "drama"}))
        .send()
        .await
        .unwrap();
    let err = failure(response).await.unwrap();
    assert_eq!(err.status, 400);
    assert_eq!(err.kind, "validation_error");

    let response = admin
        .post(api.join("genres").unwrap())
        .json(&json!({"name": "Bad", "slug": "not a slug"}))
        .send()
        .await
        .unwrap();
    let err = failure(response).await.unwrap();
    assert_eq!(err.kind, "validation_error");
}

#[tokio::test]
#[traced_test]
async fn test_titles() {
    let (args, _config_guard) = prepare_env("test_titles").await.unwrap();
    let (admin, api) = launch_env(args.clone(), TestUser::Admin).await.unwrap();
    let user = login_as(&args, TestUser::User).await.unwrap();

    let solaris = seed_catalogue(&admin, &api).await.unwrap();
    info!("Title: {solaris}");
    let solaris_id = solaris["id"].as_i64().unwrap();
    assert_eq!(solaris["rating"], 0.0);
    assert_eq!(solaris["category"]["slug"], "film");
    assert_eq!(solaris["genre"].as_array().unwrap().len(), 2);

    create_title(
        &admin,
        &api,
        &json!({"name": "Stalker", "year": 1979, "genre": ["drama"]}),
    )
    .await
    .unwrap();

    let response = admin
        .post(api.join("titles").unwrap())
        .json(&json!({"name": "Ghost", "year": 2000, "genre": ["horror"]}))
        .send()
        .await
        .unwrap();
    let err = failure(response).await.unwrap();
    assert_eq!(err.code, "unknown_reference");

    let response = admin
        .post(api.join("titles").unwrap())
        .json(&json!({"name": "Future", "year": 3000, "genre": []}))
        .send()
        .await
        .unwrap();
    let err = failure(response).await.unwrap();
    assert_eq!(err.kind, "validation_error");

    let response = user
        .post(api.join("titles").unwrap())
        .json(&json!({"name": "Mine", "year": 2000, "genre": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(failure(response).await.unwrap().status, 403);

    let mut filtered = api.join("titles").unwrap();
    filtered.set_query(Some("genre=sci-fi"));
    let page: Value = user.get(filtered).send().await.unwrap().json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["rows"][0]["name"], "Solaris");

    let mut filtered = api.join("titles").unwrap();
    filtered.set_query(Some("name=alk&year=1979"));
    let page: Value = user.get(filtered).send().await.unwrap().json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["rows"][0]["name"], "Stalker");

    let response = admin
        .patch(title_url(&api, solaris_id).unwrap())
        .json(&json!({"year": 1973, "category": null}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let patched: Value = response.json().await.unwrap();
    assert_eq!(patched["year"], 1973);
    assert_eq!(patched["name"], "Solaris");

    let response = admin
        .delete(title_url(&api, solaris_id).unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
    let response = user.get(title_url(&api, solaris_id).unwrap()).send().await.unwrap();
    assert_eq!(failure(response).await.unwrap().status, 404);
}
