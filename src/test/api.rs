#[cfg(test)]
mod tests {
    use rocket::http::{ContentType, Cookie, Status};
    use serde_json::{Value, json};

    use crate::api::LoginResponse;
    use crate::models::{PracticeCategory, PracticeRecord};
    use crate::test::utils::{TestDbBuilder, login_test_user, setup_test_client};

    #[rocket::async_test]
    async fn test_signup_then_login() {
        let test_db = TestDbBuilder::new().build().await.expect("test db");
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/signup")
            .header(ContentType::JSON)
            .body(json!({"username": "alice", "password": "pw1"}).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body: Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "User created successfully");

        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(json!({"username": "alice", "password": "pw1"}).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let login: LoginResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(login.success);
        assert_eq!(login.user.username, "alice");
        assert!(login.user.id > 0);
    }

    #[rocket::async_test]
    async fn test_signup_missing_fields() {
        let test_db = TestDbBuilder::new().build().await.expect("test db");
        let (client, _) = setup_test_client(test_db).await;

        for body in [
            json!({"username": "alice"}),
            json!({"password": "pw1"}),
            json!({"username": "", "password": "pw1"}),
        ] {
            let response = client
                .post("/api/signup")
                .header(ContentType::JSON)
                .body(body.to_string())
                .dispatch()
                .await;

            assert_eq!(response.status(), Status::BadRequest);
        }
    }

    #[rocket::async_test]
    async fn test_signup_duplicate_username() {
        let test_db = TestDbBuilder::new().user("alice").build().await.expect("test db");
        let (client, _) = setup_test_client(test_db).await;

        // The password does not matter; the name is already taken
        let response = client
            .post("/api/signup")
            .header(ContentType::JSON)
            .body(json!({"username": "alice", "password": "other_pw"}).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
        let body: Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["message"], "Username already exists");
    }

    #[rocket::async_test]
    async fn test_login_unknown_user() {
        let test_db = TestDbBuilder::new().build().await.expect("test db");
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(json!({"username": "nobody", "password": "pw"}).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::NotFound);
        let body: Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["message"], "User not found");
    }

    #[rocket::async_test]
    async fn test_login_wrong_password() {
        let test_db = TestDbBuilder::new().user("alice").build().await.expect("test db");
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(json!({"username": "alice", "password": "wrongpw"}).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Unauthorized);
        let body: Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["message"], "Incorrect password");
    }

    #[rocket::async_test]
    async fn test_auth_required() {
        let test_db = TestDbBuilder::new().build().await.expect("test db");
        let (client, _) = setup_test_client(test_db).await;

        let response = client.get("/api/data").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);

        let response = client.post("/api/add").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);

        let response = client.put("/api/update/1").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);

        let response = client.delete("/api/delete/1").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn test_forged_session_token_rejected() {
        let test_db = TestDbBuilder::new().user("alice").build().await.expect("test db");
        let (client, _) = setup_test_client(test_db).await;

        let forged_cookie = Cookie::build(("session_token", "fake_token")).build();

        let response = client
            .get("/api/data")
            .private_cookie(forged_cookie)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn test_logout_invalidates_session() {
        let test_db = TestDbBuilder::new().user("alice").build().await.expect("test db");
        let (client, _) = setup_test_client(test_db).await;

        login_test_user(&client, "alice", "password123").await;

        let response = client.get("/api/data").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let response = client.get("/api/logout").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["message"], "Logged out successfully");

        let response = client.get("/api/data").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);

        // A second logout is harmless
        let response = client.get("/api/logout").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }

    #[rocket::async_test]
    async fn test_add_forces_session_owner() {
        let test_db = TestDbBuilder::new()
            .user("alice")
            .user("bob")
            .build()
            .await
            .expect("test db");
        let (client, test_db) = setup_test_client(test_db).await;

        let alice_id = test_db.user_id("alice").expect("alice");
        let bob_id = test_db.user_id("bob").expect("bob");

        login_test_user(&client, "alice", "password123").await;

        let response = client
            .post("/api/add")
            .header(ContentType::JSON)
            .body(
                json!({
                    "practiceType": "Straight",
                    "duration": 30,
                    "score": 5,
                    "date": "2/2/2024",
                    "userId": bob_id
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let record: PracticeRecord =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();

        assert_eq!(record.user_id, alice_id, "Record owner was spoofed");
    }

    #[rocket::async_test]
    async fn test_list_is_isolated_per_user() {
        let test_db = TestDbBuilder::new()
            .user("alice")
            .user("bob")
            .record("alice", PracticeCategory::Straight, 10, 7, "1/1/2024")
            .record("alice", PracticeCategory::Backspin, 20, 4, "1/2/2024")
            .record("bob", PracticeCategory::HardDrill, 45, 9, "1/3/2024")
            .build()
            .await
            .expect("test db");
        let (client, test_db) = setup_test_client(test_db).await;

        let alice_id = test_db.user_id("alice").expect("alice");

        login_test_user(&client, "alice", "password123").await;

        let response = client.get("/api/data").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let records: Vec<PracticeRecord> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.user_id == alice_id));
    }

    #[rocket::async_test]
    async fn test_add_validation() {
        let test_db = TestDbBuilder::new().user("alice").build().await.expect("test db");
        let (client, _) = setup_test_client(test_db).await;

        login_test_user(&client, "alice", "password123").await;

        let response = client
            .post("/api/add")
            .header(ContentType::JSON)
            .body(
                json!({"practiceType": "Straight", "duration": 0, "score": 5, "date": "1/1/2024"})
                    .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client
            .post("/api/add")
            .header(ContentType::JSON)
            .body(
                json!({"practiceType": "Straight", "duration": 10, "score": 11, "date": "1/1/2024"})
                    .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn test_update_unknown_record() {
        let test_db = TestDbBuilder::new().user("alice").build().await.expect("test db");
        let (client, _) = setup_test_client(test_db).await;

        login_test_user(&client, "alice", "password123").await;

        let response = client
            .put("/api/update/9999")
            .header(ContentType::JSON)
            .body(
                json!({"practiceType": "Straight", "duration": 10, "score": 5, "date": "1/1/2024"})
                    .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_delete_unknown_record_succeeds() {
        let test_db = TestDbBuilder::new().user("alice").build().await.expect("test db");
        let (client, _) = setup_test_client(test_db).await;

        login_test_user(&client, "alice", "password123").await;

        let response = client.delete("/api/delete/9999").dispatch().await;

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().await.unwrap(), "Entry deleted");
    }

    #[rocket::async_test]
    async fn test_end_to_end_crud() {
        let test_db = TestDbBuilder::new().build().await.expect("test db");
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .post("/api/signup")
            .header(ContentType::JSON)
            .body(json!({"username": "alice", "password": "pw1"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        login_test_user(&client, "alice", "pw1").await;

        let response = client
            .post("/api/add")
            .header(ContentType::JSON)
            .body(
                json!({"practiceType": "Straight", "duration": 10, "score": 7, "date": "1/1/2024"})
                    .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let created: PracticeRecord =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(created.id > 0);
        assert_eq!(created.practice_type, PracticeCategory::Straight);
        assert_eq!(created.duration, 10);
        assert_eq!(created.score, 7);
        assert_eq!(created.date, "1/1/2024");

        let response = client.get("/api/data").dispatch().await;
        let records: Vec<PracticeRecord> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(records.iter().any(|r| r.id == created.id));

        let response = client
            .put(format!("/api/update/{}", created.id))
            .header(ContentType::JSON)
            .body(
                json!({"practiceType": "Backspin", "duration": 15, "score": 9, "date": "1/1/2024"})
                    .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let updated: PracticeRecord =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.practice_type, PracticeCategory::Backspin);
        assert_eq!(updated.duration, 15);
        assert_eq!(updated.score, 9);

        let response = client
            .delete(format!("/api/delete/{}", created.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client.get("/api/data").dispatch().await;
        let records: Vec<PracticeRecord> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(!records.iter().any(|r| r.id == created.id));
    }

    #[rocket::async_test]
    async fn test_github_login_redirects_to_provider() {
        let test_db = TestDbBuilder::new().build().await.expect("test db");
        let (client, _) = setup_test_client(test_db).await;

        let response = client.get("/api/auth/github").dispatch().await;

        assert_eq!(response.status(), Status::SeeOther);
        let location = response
            .headers()
            .get_one("Location")
            .expect("redirect location");
        assert!(location.starts_with("https://github.com/login/oauth/authorize"));
        assert!(location.contains("state="));
    }

    #[rocket::async_test]
    async fn test_github_callback_without_state_redirects_to_root() {
        let test_db = TestDbBuilder::new().build().await.expect("test db");
        let (client, _) = setup_test_client(test_db).await;

        let response = client
            .get("/api/auth/github/callback?code=abc&state=xyz")
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(response.headers().get_one("Location"), Some("/"));
    }
}
