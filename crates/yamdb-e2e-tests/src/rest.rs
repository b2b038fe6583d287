use anyhow::{Result, bail};
use reqwest::{Client, Response, Url};
use serde_json::{Value, json};
use tracing::info;

/// Status and error classification of failed response
#[derive(Debug)]
pub struct Failure {
    pub status: u16,
    pub kind: String,
    pub code: String,
}

pub async fn failure(response: Response) -> Result<Failure> {
    let status = response.status().as_u16();
    if response.status().is_success() {
        bail!("Expected failure, got {status}");
    }
    let body: Value = response.json().await?;
    info!("Error body: {body}");
    Ok(Failure {
        status,
        kind: body["kind"].as_str().unwrap_or_default().to_string(),
        code: body["code"].as_str().unwrap_or_default().to_string(),
    })
}

async fn created(response: Response) -> Result<Value> {
    let status = response.status().as_u16();
    if status != 201 {
        bail!("Expected 201, got {status}: {}", response.text().await?);
    }
    Ok(response.json().await?)
}

pub async fn create_category(client: &Client, api: &Url, name: &str, slug: &str) -> Result<Value> {
    let response = client
        .post(api.join("categories")?)
        .json(&json!({"name": name, "slug": slug}))
        .send()
        .await?;
    created(response).await
}

pub async fn create_genre(client: &Client, api: &Url, name: &str, slug: &str) -> Result<Value> {
    let response = client
        .post(api.join("genres")?)
        .json(&json!({"name": name, "slug": slug}))
        .send()
        .await?;
    created(response).await
}

pub async fn create_title(client: &Client, api: &Url, payload: &Value) -> Result<Value> {
    let response = client.post(api.join("titles")?).json(payload).send().await?;
    created(response).await
}

pub async fn create_review(
    client: &Client,
    api: &Url,
    title_id: i64,
    text: &str,
    score: u8,
) -> Result<Value> {
    let response = client
        .post(reviews_url(api, title_id)?)
        .json(&json!({"text": text, "score": score}))
        .send()
        .await?;
    created(response).await
}

pub async fn create_comment(
    client: &Client,
    api: &Url,
    title_id: i64,
    review_id: i64,
    text: &str,
) -> Result<Value> {
    let response = client
        .post(comments_url(api, title_id, review_id)?)
        .json(&json!({"text": text}))
        .send()
        .await?;
    created(response).await
}

pub fn title_url(api: &Url, title_id: i64) -> Result<Url> {
    Ok(api.join(&format!("titles/{title_id}"))?)
}

pub fn reviews_url(api: &Url, title_id: i64) -> Result<Url> {
    Ok(api.join(&format!("titles/{title_id}/reviews"))?)
}

pub fn review_url(api: &Url, title_id: i64, review_id: i64) -> Result<Url> {
    Ok(api.join(&format!("titles/{title_id}/reviews/{review_id}"))?)
}

pub fn comments_url(api: &Url, title_id: i64, review_id: i64) -> Result<Url> {
    Ok(api.join(&format!("titles/{title_id}/reviews/{review_id}/comments"))?)
}

pub fn comment_url(api: &Url, title_id: i64, review_id: i64, comment_id: i64) -> Result<Url> {
    Ok(api.join(&format!(
        "titles/{title_id}/reviews/{review_id}/comments/{comment_id}"
    ))?)
}

/// Category `film`, genres `drama` and `sci-fi` and one title using them all
pub async fn seed_catalogue(admin: &Client, api: &Url) -> Result<Value> {
    create_category(admin, api, "Film", "film").await?;
    create_genre(admin, api, "Drama", "drama").await?;
    create_genre(admin, api, "Science fiction", "sci-fi").await?;
    create_title(
        admin,
        api,
        &json!({
            "name": "Solaris",
            "year": 1972,
            "description": "Psychologist is sent to a station orbiting a distant planet",
            "genre": ["drama", "sci-fi"],
            "category": "film"
        }),
    )
    .await
}
