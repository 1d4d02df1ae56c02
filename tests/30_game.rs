mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use challengr_api::types::Role;
use common::TestServer;

fn id_of(value: &Value) -> Result<i64> {
    value["id"].as_i64().context("row id")
}

#[tokio::test]
async fn first_login_creates_user_and_score_once() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };

    let fb_id = uuid::Uuid::new_v4().simple().to_string();
    let email = format!("{}@example.com", &fb_id[..10]);
    let login = json!({ "email": email.to_uppercase(), "facebook_token": format!("fb:{}:{}", fb_id, email) });

    let first: Value = server.client.post(server.url("/login")).json(&login).send().await?.json().await?;
    assert!(!first["token"].as_str().unwrap_or_default().is_empty());
    let user_id = id_of(&first["user"])?;

    let res = server.client.post(server.url("/login")).json(&login).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let second: Value = res.json().await?;
    assert_eq!(id_of(&second["user"])?, user_id);

    let (users, scores): (i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM users WHERE facebook_user_id = $1),
                (SELECT COUNT(*) FROM scores s JOIN users u ON u.id = s.user_id WHERE u.facebook_user_id = $1)",
    )
    .bind(&fb_id)
    .fetch_one(server.pool())
    .await?;
    assert_eq!((users, scores), (1, 1));

    let token = first["token"].as_str().unwrap_or_default();
    let score = server.score_of(token, user_id).await?;
    assert_eq!(score["exp"], 0);
    assert_eq!(score["coins"], 0);
    assert_eq!(score["likes_remaining"], 20);
    assert_eq!(score["level"]["id"], 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_add_likes_lose_no_updates() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };
    let (token, user) = server.login_new_user().await?;
    let user_id = id_of(&user)?;
    let score_id = id_of(&server.score_of(&token, user_id).await?)?;

    let url = server.url(&format!("/user/{}/score/{}/add_likes", user_id, score_id));
    let calls = (0..16).map(|_| {
        server
            .client
            .put(url.clone())
            .bearer_auth(&token)
            .json(&json!({ "amount": 1 }))
            .send()
    });
    for res in futures::future::join_all(calls).await {
        assert_eq!(res?.status(), StatusCode::OK);
    }

    let score = server.score_of(&token, user_id).await?;
    assert_eq!(score["likes_remaining"], 20 + 16);
    Ok(())
}

#[tokio::test]
async fn decrement_guard_refuses_without_partial_change() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };
    let (token, user) = server.login_new_user().await?;
    let user_id = id_of(&user)?;
    let score_id = id_of(&server.score_of(&token, user_id).await?)?;

    let res = server
        .client
        .put(server.url(&format!("/user/{}/score/{}/use_likes", user_id, score_id)))
        .bearer_auth(&token)
        .json(&json!({ "amount": 21 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = res.json().await?;
    assert!(body["error"].as_str().unwrap_or_default().starts_with("Not allowed"));

    let res = server
        .client
        .put(server.url(&format!("/user/{}/score/{}/use_likes", user_id, score_id)))
        .bearer_auth(&token)
        .json(&json!({ "amount": 20 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["likes_remaining"], 0);
    Ok(())
}

#[tokio::test]
async fn increment_past_bigint_is_refused() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };
    let (token, user) = server.login_new_user().await?;
    let user_id = id_of(&user)?;
    let score_id = id_of(&server.score_of(&token, user_id).await?)?;
    let add_coins = server.url(&format!("/user/{}/score/{}/add_coins", user_id, score_id));

    let res = server
        .client
        .put(&add_coins)
        .bearer_auth(&token)
        .json(&json!({ "amount": i64::MAX }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .client
        .put(&add_coins)
        .bearer_auth(&token)
        .json(&json!({ "amount": i64::MAX }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Not allowed: coins limit reached");

    let score = server.score_of(&token, user_id).await?;
    assert_eq!(score["coins"], i64::MAX);
    Ok(())
}

#[tokio::test]
async fn liking_twice_keeps_one_like() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };
    let (token, user) = server.login_new_user().await?;
    let user_id = id_of(&user)?;
    let challenge_id = server.insert_challenge(user_id, "Handstand").await?;

    let res = server
        .client
        .post(server.url(&format!("/challenge/{}/post", challenge_id)))
        .bearer_auth(&token)
        .json(&json!({ "file_url": "https://bucket.test/a.mp4", "content_type": "video/mp4", "content_size": 1024 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let post_id = id_of(&res.json::<Value>().await?)?;

    let like_url = server.url(&format!("/challenge/{}/post/{}/like", challenge_id, post_id));
    for _ in 0..2 {
        let res = server.client.put(&like_url).bearer_auth(&token).send().await?;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let post: Value = server
        .client
        .get(server.url(&format!("/challenge/{}/post/{}", challenge_id, post_id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(post["likes"].as_array().map(Vec::len), Some(1));
    assert_eq!(post["likes"][0]["user_id"], user_id);

    let res = server
        .client
        .put(server.url(&format!("/challenge/{}/post/{}/unlike", challenge_id, post_id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn non_owner_cannot_touch_a_challenge() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };
    let (_, owner) = server.login_new_user().await?;
    let (intruder_token, _) = server.login_new_user().await?;
    let challenge_id = server.insert_challenge(id_of(&owner)?, "Plank").await?;

    let res = server
        .client
        .put(server.url(&format!("/challenge/{}", challenge_id)))
        .bearer_auth(&intruder_token)
        .json(&json!({ "description": "hijacked" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .delete(server.url(&format!("/challenge/{}", challenge_id)))
        .bearer_auth(&intruder_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let challenge: Value = server
        .client
        .get(server.url(&format!("/challenge/{}", challenge_id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(challenge["description"], "test challenge");
    Ok(())
}

#[tokio::test]
async fn low_level_users_cannot_create_challenges() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };
    let (token, _) = server.login_new_user().await?;

    let res = server
        .client
        .post(server.url("/challenge"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Juggle", "description": "Three balls" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Not allowed. Need level 5 or more.");
    Ok(())
}

#[tokio::test]
async fn challenge_request_can_only_be_answered_once() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };
    let (sender_token, sender) = server.login_new_user().await?;
    let (receiver_token, receiver) = server.login_new_user().await?;
    let (sender_id, receiver_id) = (id_of(&sender)?, id_of(&receiver)?);
    let challenge_id = server.insert_challenge(sender_id, "Sprint").await?;

    let res = server
        .client
        .post(server.url(&format!("/user/{}/challenge_request", sender_id)))
        .bearer_auth(&sender_token)
        .json(&json!({ "to_id": receiver_id, "challenge_id": challenge_id, "message": "Beat me" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let request_id = id_of(&res.json::<Value>().await?)?;

    let received: Value = server
        .client
        .get(server.url(&format!("/user/{}/challenge_request?type=received", receiver_id)))
        .bearer_auth(&receiver_token)
        .send()
        .await?
        .json()
        .await?;
    assert!(received
        .as_array()
        .map(|rows| rows.iter().any(|r| r["id"] == request_id))
        .unwrap_or(false));

    let respond = server.url(&format!(
        "/user/{}/challenge_request/{}?status=accepted",
        receiver_id, request_id
    ));
    let res = server.client.put(&respond).bearer_auth(&receiver_token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["challenge_id"], challenge_id);
    assert_eq!(body["status"], 200);

    let res = server.client.put(&respond).bearer_auth(&receiver_token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server
        .client
        .delete(server.url(&format!("/user/{}/challenge_request/{}", sender_id, request_id)))
        .bearer_auth(&sender_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn hot_listing_is_capped_and_active_only() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };
    let (_, user) = server.login_new_user().await?;
    let user_id = id_of(&user)?;
    for n in 0..3 {
        server.insert_challenge(user_id, &format!("Hot {}", n)).await?;
    }
    let hidden = server.insert_challenge(user_id, "Hidden").await?;
    sqlx::query("UPDATE challenges SET status = 'inactive' WHERE id = $1")
        .bind(hidden)
        .execute(server.pool())
        .await?;

    let res = server.client.get(server.url("/challenge?type=hot")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let rows: Vec<Value> = res.json().await?;
    assert!(rows.len() <= 20);
    assert!(rows.iter().all(|c| c["status"] == "active"));
    assert!(rows.iter().all(|c| c["id"] != hidden));

    let mine: Vec<Value> = server
        .client
        .get(server.url(&format!("/challenge?type=fresh&user_id={}", user_id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(mine.len(), 3);
    Ok(())
}

#[tokio::test]
async fn hot_listing_follows_post_and_like_ranking() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };
    let (_, user) = server.login_new_user().await?;
    let user_id = id_of(&user)?;

    // Heavy weight lifts both above unrelated rows; busy scores 3 * 2 * 1001, quiet 1 * 1 * 1001.
    let quiet = server.insert_challenge(user_id, "Quiet").await?;
    let busy = server.insert_challenge(user_id, "Busy").await?;
    sqlx::query("UPDATE challenges SET weight = 1000 WHERE id = ANY($1)")
        .bind(vec![quiet, busy])
        .execute(server.pool())
        .await?;
    server.insert_post(user_id, quiet).await?;
    for _ in 0..3 {
        let post_id = server.insert_post(user_id, busy).await?;
        sqlx::query("INSERT INTO likes (user_id, post_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(post_id)
            .execute(server.pool())
            .await?;
    }

    let rows: Vec<Value> = server
        .client
        .get(server.url("/challenge?type=hot"))
        .send()
        .await?
        .json()
        .await?;

    let hot_score = |c: &Value| -> f64 {
        let posts = c["post_count"].as_f64().unwrap_or_default();
        let likes = c["like_count"].as_f64().unwrap_or_default();
        posts * (1.0 + likes / posts.max(1.0)) * (1.0 + c["weight"].as_f64().unwrap_or_default())
    };
    assert!(rows.windows(2).all(|pair| hot_score(&pair[0]) >= hot_score(&pair[1])));

    let position = |id: i64| rows.iter().position(|c| c["id"] == id);
    let (busy_at, quiet_at) = (position(busy), position(quiet));
    assert!(busy_at.is_some() && quiet_at.is_some());
    assert!(busy_at < quiet_at);
    assert_eq!(rows[busy_at.unwrap_or_default()]["like_count"], 3);

    sqlx::query("UPDATE challenges SET status = 'inactive' WHERE id = ANY($1)")
        .bind(vec![quiet, busy])
        .execute(server.pool())
        .await?;
    Ok(())
}

#[tokio::test]
async fn buying_a_level_debits_coins_atomically() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };
    let (token, user) = server.login_new_user().await?;
    let user_id = id_of(&user)?;
    let score_id = id_of(&server.score_of(&token, user_id).await?)?;
    let purchase = server.url(&format!("/user/{}/bought_item", user_id));

    let res = server
        .client
        .post(&purchase)
        .bearer_auth(&token)
        .json(&json!({ "level_id": 2, "amount": 100, "currency": "coins" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    let res = server
        .client
        .put(server.url(&format!("/user/{}/score/{}/add_coins", user_id, score_id)))
        .bearer_auth(&token)
        .json(&json!({ "amount": 150 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .client
        .post(&purchase)
        .bearer_auth(&token)
        .json(&json!({ "level_id": 2, "amount": 99, "currency": "coins" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .post(&purchase)
        .bearer_auth(&token)
        .json(&json!({ "level_id": 2, "amount": 100, "currency": "coins" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let score = server.score_of(&token, user_id).await?;
    assert_eq!(score["coins"], 50);
    assert_eq!(score["level_id"], 2);
    assert_eq!(score["bought_items"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn money_purchases_never_change_the_level() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };
    let (token, user) = server.login_new_user().await?;
    let user_id = id_of(&user)?;
    let purchase = server.url(&format!("/user/{}/bought_item", user_id));

    let res = server
        .client
        .post(&purchase)
        .bearer_auth(&token)
        .json(&json!({ "level_id": 10, "amount": 1, "currency": "money" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["fields"], json!(["currency"]));

    let res = server
        .client
        .post(server.url("/challenge"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Skip", "description": "Straight to the top" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    let item_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO vanity_items (name, coin_price, money_price) VALUES ('Cape', 500, 199) RETURNING id",
    )
    .fetch_one(server.pool())
    .await?;

    let res = server
        .client
        .post(&purchase)
        .bearer_auth(&token)
        .json(&json!({ "vanity_item_id": item_id, "amount": 1, "currency": "money" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["fields"], json!(["amount"]));

    let res = server
        .client
        .post(&purchase)
        .bearer_auth(&token)
        .json(&json!({ "vanity_item_id": item_id, "amount": 199, "currency": "money" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let score = server.score_of(&token, user_id).await?;
    assert_eq!(score["level_id"], 1);
    assert_eq!(score["coins"], 0);
    assert_eq!(score["bought_items"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn admin_acts_on_any_user() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };
    let (_, user) = server.login_new_user().await?;
    let user_id = id_of(&user)?;
    let admin = server.token_for(i64::MAX, Role::Admin);

    let res = server
        .client
        .put(server.url(&format!("/user/{}/level", user_id)))
        .bearer_auth(&admin)
        .json(&json!({ "level_id": 5 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let users: Vec<Value> = server
        .client
        .get(server.url(&format!("/user?ids={}", user_id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["level_id"], 5);
    assert!(users[0].get("role").is_none());
    Ok(())
}
