use serde_json::{Value, json};
use tracing_test::traced_test;
use yamdb_e2e_tests::{
    TestUser, launch_env, login_as, prepare_env,
    rest::{
        comment_url, comments_url, create_comment, create_review, failure, review_url,
        reviews_url, seed_catalogue, title_url,
    },
};

#[tokio::test]
#[traced_test]
async fn test_reviews_and_rating() {
    let (args, _config_guard) = prepare_env("test_reviews_and_rating").await.unwrap();
    let (admin, api) = launch_env(args.clone(), TestUser::Admin).await.unwrap();
    let user = login_as(&args, TestUser::User).await.unwrap();
    let other = login_as(&args, TestUser::OtherUser).await.unwrap();
    let anonymous = login_as(&args, TestUser::Anonymous).await.unwrap();

    let title = seed_catalogue(&admin, &api).await.unwrap();
    let title_id = title["id"].as_i64().unwrap();

    let review = create_review(&user, &api, title_id, "Great", 8).await.unwrap();
    assert_eq!(review["author"], "usak");
    assert_eq!(review["score"], 8);
    create_review(&other, &api, title_id, "Masterpiece", 10)
        .await
        .unwrap();

    let response = user
        .post(reviews_url(&api, title_id).unwrap())
        .json(&json!({"text": "Once more", "score": 1}))
        .send()
        .await
        .unwrap();
    let err = failure(response).await.unwrap();
    assert_eq!(err.status, 400);
    assert_eq!(err.kind, "validation_error");
    assert_eq!(err.code, "duplicate_review");

    let response = other
        .post(reviews_url(&api, title_id).unwrap())
        .json(&json!({"text": "Out of range", "score": 11}))
        .send()
        .await
        .unwrap();
    assert_eq!(failure(response).await.unwrap().kind, "validation_error");

    let response = anonymous
        .post(reviews_url(&api, title_id).unwrap())
        .json(&json!({"text": "Anonymous", "score": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(failure(response).await.unwrap().status, 403);

    let title: Value = anonymous
        .get(title_url(&api, title_id).unwrap())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(title["rating"], 9.0);

    let page: Value = anonymous
        .get(reviews_url(&api, title_id).unwrap())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 2);

    let response = anonymous
        .get(reviews_url(&api, 9999).unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(failure(response).await.unwrap().status, 404);
}

#[tokio::test]
#[traced_test]
async fn test_review_ownership() {
    let (args, _config_guard) = prepare_env("test_review_ownership").await.unwrap();
    let (admin, api) = launch_env(args.clone(), TestUser::Admin).await.unwrap();
    let user = login_as(&args, TestUser::User).await.unwrap();
    let other = login_as(&args, TestUser::OtherUser).await.unwrap();
    let moderator = login_as(&args, TestUser::Moderator).await.unwrap();

    let title_id = seed_catalogue(&admin, &api).await.unwrap()["id"]
        .as_i64()
        .unwrap();
    let review_id = create_review(&user, &api, title_id, "Good", 7).await.unwrap()["id"]
        .as_i64()
        .unwrap();
    let url = review_url(&api, title_id, review_id).unwrap();

    let response = user
        .patch(url.clone())
        .json(&json!({"score": 9}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["score"], 9);
    assert_eq!(updated["text"], "Good");
    assert_eq!(updated["author"], "usak");

    let response = other
        .patch(url.clone())
        .json(&json!({"score": 1}))
        .send()
        .await
        .unwrap();
    let err = failure(response).await.unwrap();
    assert_eq!(err.status, 403);
    assert_eq!(err.code, "permission_denied");

    let response = other.delete(url.clone()).send().await.unwrap();
    assert_eq!(failure(response).await.unwrap().status, 403);

    let response = moderator
        .put(url.clone())
        .json(&json!({"text": "Moderated", "score": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = moderator.delete(url.clone()).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 204);
    let response = user.get(url).send().await.unwrap();
    assert_eq!(failure(response).await.unwrap().status, 404);
}

#[tokio::test]
#[traced_test]
async fn test_comments() {
    let (args, _config_guard) = prepare_env("test_comments").await.unwrap();
    let (admin, api) = launch_env(args.clone(), TestUser::Admin).await.unwrap();
    let user = login_as(&args, TestUser::User).await.unwrap();
    let other = login_as(&args, TestUser::OtherUser).await.unwrap();
    let moderator = login_as(&args, TestUser::Moderator).await.unwrap();
    let anonymous = login_as(&args, TestUser::Anonymous).await.unwrap();

    let title_id = seed_catalogue(&admin, &api).await.unwrap()["id"]
        .as_i64()
        .unwrap();
    let review_id = create_review(&user, &api, title_id, "Good", 7).await.unwrap()["id"]
        .as_i64()
        .unwrap();

    let comment = create_comment(&other, &api, title_id, review_id, "I disagree")
        .await
        .unwrap();
    assert_eq!(comment["author"], "pepa");
    let comment_id = comment["id"].as_i64().unwrap();
    let url = comment_url(&api, title_id, review_id, comment_id).unwrap();

    let response = anonymous.delete(url.clone()).send().await.unwrap();
    let err = failure(response).await.unwrap();
    assert_eq!(err.status, 403);
    assert_eq!(err.code, "not_authenticated");

    let response = user.delete(url.clone()).send().await.unwrap();
    assert_eq!(failure(response).await.unwrap().code, "permission_denied");

    let response = other
        .patch(url.clone())
        .json(&json!({"text": "I somewhat disagree"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let page: Value = anonymous
        .get(comments_url(&api, title_id, review_id).unwrap())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["rows"][0]["text"], "I somewhat disagree");

    // comment is reachable only under its own review
    let response = anonymous
        .get(comment_url(&api, title_id, review_id + 1, comment_id).unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(failure(response).await.unwrap().status, 404);

    let response = moderator.delete(url.clone()).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 204);
    let response = anonymous.get(url).send().await.unwrap();
    assert_eq!(failure(response).await.unwrap().status, 404);
}
