#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::module_inception)]
mod tests {
    use anyhow::Result;
    use axum::http::StatusCode;
    use axum_extra::extract::cookie::{Cookie, Key};
    use axum_test::TestServer;
    use serde_json::Value;

    use crate::http::session::SESSION_COOKIE;
    use crate::http::{router, AppState};
    use crate::password::tests::fast_hasher;
    use crate::store::Store;

    fn test_server() -> TestServer {
        let state = AppState {
            store: Store::in_memory(),
            hasher: fast_hasher(),
            cookie_key: Key::generate(),
            cookie_secure: false,
        };
        TestServer::new(router(state)).unwrap()
    }

    async fn register(server: &TestServer, email: &str) -> Cookie<'static> {
        let response = server
            .post("/register")
            .form(&[("email", email), ("password", "hunter2")])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        response.cookie(SESSION_COOKIE)
    }

    async fn create_campaign(server: &TestServer, admin: &Cookie<'static>, status: &str) -> u64 {
        let response = server
            .post("/admin/campaigns")
            .add_cookie(admin.clone())
            .form(&[
                ("title", "Clean water"),
                ("description", "Wells for three villages"),
                ("status", status),
            ])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

        let listing: Value = server
            .get("/admin/campaigns")
            .add_cookie(admin.clone())
            .await
            .json();
        listing["campaigns"][0]["id"].as_u64().unwrap()
    }

    #[tokio::test]
    async fn health_reports_counts() -> Result<()> {
        let server = test_server();
        register(&server, "root@example.com").await;

        let response = server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["users"], 1);
        assert_eq!(body["campaigns"], 0);
        Ok(())
    }

    #[tokio::test]
    async fn registration_signs_in_and_first_user_is_admin() -> Result<()> {
        let server = test_server();
        let response = server
            .post("/register")
            .form(&[("email", "  Root@Example.com "), ("password", "hunter2")])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/");
        let admin = response.cookie(SESSION_COOKIE);
        assert_eq!(admin.http_only(), Some(true));

        let page: Value = server.get("/").add_cookie(admin).await.json();
        assert_eq!(page["viewer"]["state"], "authenticated");
        assert_eq!(page["viewer"]["email"], "root@example.com");
        assert_eq!(page["viewer"]["role"], "admin");

        let second = register(&server, "alice@example.com").await;
        let page: Value = server.get("/").add_cookie(second).await.json();
        assert_eq!(page["viewer"]["role"], "user");
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_registration_rerenders_form() -> Result<()> {
        let server = test_server();
        register(&server, "alice@example.com").await;

        let response = server
            .post("/register")
            .form(&[("email", "ALICE@example.com"), ("password", "other")])
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert!(response.maybe_cookie(SESSION_COOKIE).is_none());
        let body: Value = response.json();
        assert_eq!(body["form"], "register");
        assert_eq!(body["error"], "A user with this email already exists.");
        assert!(!response.text().contains("other"));
        Ok(())
    }

    #[tokio::test]
    async fn login_accepts_correct_credentials_only() -> Result<()> {
        let server = test_server();
        register(&server, "alice@example.com").await;

        let wrong = server
            .post("/login")
            .form(&[("email", "alice@example.com"), ("password", "nope")])
            .await;
        assert_eq!(wrong.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = wrong.json();
        assert_eq!(body["form"], "login");
        assert_eq!(body["error"], "Incorrect email or password.");

        let unknown = server
            .post("/login")
            .form(&[("email", "bob@example.com"), ("password", "hunter2")])
            .await;
        assert_eq!(unknown.status_code(), StatusCode::BAD_REQUEST);
        let unknown_body: Value = unknown.json();
        assert_eq!(unknown_body, body);

        let ok = server
            .post("/login")
            .form(&[("email", "alice@example.com"), ("password", "hunter2")])
            .await;
        assert_eq!(ok.status_code(), StatusCode::SEE_OTHER);
        let cookie = ok.cookie(SESSION_COOKIE);
        let donations = server.get("/me/donations").add_cookie(cookie).await;
        assert_eq!(donations.status_code(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn logout_clears_the_session_cookie() -> Result<()> {
        let server = test_server();
        let cookie = register(&server, "alice@example.com").await;

        let response = server.post("/logout").add_cookie(cookie).await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        let cleared = response.cookie(SESSION_COOKIE);
        assert_eq!(cleared.value(), "");

        let page: Value = server.get("/").add_cookie(cleared).await.json();
        assert_eq!(page["viewer"]["state"], "anonymous");
        Ok(())
    }

    #[tokio::test]
    async fn tampered_or_unsigned_cookie_is_anonymous() -> Result<()> {
        let server = test_server();
        register(&server, "root@example.com").await;
        let alice = register(&server, "alice@example.com").await;

        let value = alice.value();
        let forged = format!("{}1", &value[..value.len() - 1]);
        let response = server
            .get("/me/donations")
            .add_cookie(Cookie::new(SESSION_COOKIE, forged))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let response = server
            .get("/admin/campaigns")
            .add_cookie(Cookie::new(SESSION_COOKIE, "1"))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn admin_routes_require_admin_role() -> Result<()> {
        let server = test_server();
        register(&server, "root@example.com").await;
        let alice = register(&server, "alice@example.com").await;

        let anonymous = server.get("/admin/campaigns").await;
        assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);
        let body: Value = anonymous.json();
        assert_eq!(body["error"], "Not authenticated");

        let user = server.get("/admin/campaigns").add_cookie(alice.clone()).await;
        assert_eq!(user.status_code(), StatusCode::FORBIDDEN);

        let create = server
            .post("/admin/campaigns")
            .add_cookie(alice.clone())
            .form(&[("title", "Mine"), ("description", "x")])
            .await;
        assert_eq!(create.status_code(), StatusCode::FORBIDDEN);

        let new_form = server.get("/admin/campaigns/new").add_cookie(alice).await;
        assert_eq!(new_form.status_code(), StatusCode::FORBIDDEN);

        let health: Value = server.get("/health").await.json();
        assert_eq!(health["campaigns"], 0);
        Ok(())
    }

    #[tokio::test]
    async fn unauthenticated_post_is_rejected_before_validation() -> Result<()> {
        let server = test_server();
        let response = server
            .post("/campaigns/1/donate")
            .form(&[("amount", "not a number")])
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn public_listing_hides_closed_campaigns() -> Result<()> {
        let server = test_server();
        let admin = register(&server, "root@example.com").await;
        let open = create_campaign(&server, &admin, "open").await;
        let closed = create_campaign(&server, &admin, "closed").await;

        let page: Value = server.get("/").await.json();
        let ids = page["campaigns"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_u64().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![open]);
        assert_eq!(page["campaigns"][0]["total"], 0);

        let hidden = server.get(&format!("/campaigns/{closed}")).await;
        assert_eq!(hidden.status_code(), StatusCode::NOT_FOUND);

        let as_admin = server
            .get(&format!("/campaigns/{closed}"))
            .add_cookie(admin.clone())
            .await;
        assert_eq!(as_admin.status_code(), StatusCode::OK);
        let body: Value = as_admin.json();
        assert_eq!(body["campaign"]["status"], "closed");

        let admin_index: Value = server.get("/").add_cookie(admin).await.json();
        assert_eq!(admin_index["campaigns"].as_array().unwrap().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_status_value_is_stored_as_open() -> Result<()> {
        let server = test_server();
        let admin = register(&server, "root@example.com").await;
        let id = create_campaign(&server, &admin, "archived").await;

        let body: Value = server.get(&format!("/campaigns/{id}")).await.json();
        assert_eq!(body["campaign"]["status"], "open");
        Ok(())
    }

    #[tokio::test]
    async fn admin_can_close_a_campaign() -> Result<()> {
        let server = test_server();
        let admin = register(&server, "root@example.com").await;
        let id = create_campaign(&server, &admin, "open").await;

        let form: Value = server
            .get(&format!("/admin/campaigns/{id}/edit"))
            .add_cookie(admin.clone())
            .await
            .json();
        assert_eq!(form["form"], "edit_campaign");
        assert_eq!(form["values"]["title"], "Clean water");

        let response = server
            .post(&format!("/admin/campaigns/{id}/edit"))
            .add_cookie(admin.clone())
            .form(&[
                ("title", "Clean water"),
                ("description", "Funded"),
                ("status", "closed"),
            ])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/admin/campaigns");

        let hidden = server.get(&format!("/campaigns/{id}")).await;
        assert_eq!(hidden.status_code(), StatusCode::NOT_FOUND);

        let blank_title = server
            .post(&format!("/admin/campaigns/{id}/edit"))
            .add_cookie(admin.clone())
            .form(&[("title", "   "), ("description", "x")])
            .await;
        assert_eq!(blank_title.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = blank_title.json();
        assert_eq!(body["form"], "edit_campaign");

        let missing = server
            .post("/admin/campaigns/999/edit")
            .add_cookie(admin)
            .form(&[("title", "t"), ("description", "d")])
            .await;
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn donations_update_totals_and_history() -> Result<()> {
        let server = test_server();
        let admin = register(&server, "root@example.com").await;
        let alice = register(&server, "alice@example.com").await;
        let id = create_campaign(&server, &admin, "open").await;

        for amount in ["25", "17"] {
            let response = server
                .post(&format!("/campaigns/{id}/donate"))
                .add_cookie(alice.clone())
                .form(&[("amount", amount)])
                .await;
            assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
            assert_eq!(response.header("location"), format!("/campaigns/{id}").as_str());
        }

        let detail: Value = server.get(&format!("/campaigns/{id}")).await.json();
        assert_eq!(detail["campaign"]["total"], 42);

        let history: Value = server
            .get("/me/donations")
            .add_cookie(alice)
            .await
            .json();
        let amounts = history["donations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["amount"].as_u64().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(amounts, vec![17, 25]);
        assert_eq!(history["donations"][0]["campaign_title"], "Clean water");

        let own: Value = server.get("/me/donations").add_cookie(admin).await.json();
        assert!(own["donations"].as_array().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn donation_amount_bounds_are_enforced() -> Result<()> {
        let server = test_server();
        let admin = register(&server, "root@example.com").await;
        let id = create_campaign(&server, &admin, "open").await;

        for bad in ["0", "-5", "1000000000", "12.5", "", "ten"] {
            let response = server
                .post(&format!("/campaigns/{id}/donate"))
                .add_cookie(admin.clone())
                .form(&[("amount", bad)])
                .await;
            assert_eq!(
                response.status_code(),
                StatusCode::BAD_REQUEST,
                "amount {bad:?} accepted"
            );
        }

        for good in ["1", "999999999"] {
            let response = server
                .post(&format!("/campaigns/{id}/donate"))
                .add_cookie(admin.clone())
                .form(&[("amount", good)])
                .await;
            assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        }

        let missing = server
            .post("/campaigns/999/donate")
            .add_cookie(admin)
            .form(&[("amount", "5")])
            .await;
        assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn closed_campaign_rejects_donations() -> Result<()> {
        let server = test_server();
        let admin = register(&server, "root@example.com").await;
        let alice = register(&server, "alice@example.com").await;
        let id = create_campaign(&server, &admin, "closed").await;

        let response = server
            .post(&format!("/campaigns/{id}/donate"))
            .add_cookie(alice)
            .form(&[("amount", "5")])
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn comments_are_validated_and_owned() -> Result<()> {
        let server = test_server();
        let admin = register(&server, "root@example.com").await;
        let alice = register(&server, "alice@example.com").await;
        let bob = register(&server, "bob@example.com").await;
        let id = create_campaign(&server, &admin, "open").await;

        let blank = server
            .post(&format!("/campaigns/{id}/comments"))
            .add_cookie(alice.clone())
            .form(&[("content", "   \n\t ")])
            .await;
        assert_eq!(blank.status_code(), StatusCode::BAD_REQUEST);

        let posted = server
            .post(&format!("/campaigns/{id}/comments"))
            .add_cookie(alice.clone())
            .form(&[("content", "  Good luck!  ")])
            .await;
        assert_eq!(posted.status_code(), StatusCode::SEE_OTHER);

        let detail: Value = server
            .get(&format!("/campaigns/{id}"))
            .add_cookie(bob.clone())
            .await
            .json();
        let comment = &detail["comments"][0];
        assert_eq!(comment["content"], "Good luck!");
        assert_eq!(comment["author_email"], "alice@example.com");
        assert_eq!(comment["can_edit"], false);
        let comment_id = comment["id"].as_u64().unwrap();

        let edit_as_bob = server
            .post(&format!("/comments/{comment_id}/edit"))
            .add_cookie(bob.clone())
            .form(&[("content", "hijacked")])
            .await;
        assert_eq!(edit_as_bob.status_code(), StatusCode::FORBIDDEN);
        let form_as_bob = server
            .get(&format!("/comments/{comment_id}/edit"))
            .add_cookie(bob.clone())
            .await;
        assert_eq!(form_as_bob.status_code(), StatusCode::FORBIDDEN);
        let delete_as_bob = server
            .post(&format!("/comments/{comment_id}/delete"))
            .add_cookie(bob)
            .await;
        assert_eq!(delete_as_bob.status_code(), StatusCode::FORBIDDEN);

        let edited = server
            .post(&format!("/comments/{comment_id}/edit"))
            .add_cookie(alice.clone())
            .form(&[("content", "Best of luck!")])
            .await;
        assert_eq!(edited.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(edited.header("location"), format!("/campaigns/{id}").as_str());

        let detail: Value = server.get(&format!("/campaigns/{id}")).await.json();
        assert_eq!(detail["comments"][0]["content"], "Best of luck!");
        assert!(!detail["comments"][0]["updated_at"].is_null());

        let removed = server
            .post(&format!("/comments/{comment_id}/delete"))
            .add_cookie(admin)
            .await;
        assert_eq!(removed.status_code(), StatusCode::SEE_OTHER);

        let gone = server
            .post(&format!("/comments/{comment_id}/delete"))
            .add_cookie(alice)
            .await;
        assert_eq!(gone.status_code(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn form_pages_render_for_the_current_viewer() -> Result<()> {
        let server = test_server();
        let page: Value = server.get("/register").await.json();
        assert_eq!(page["form"], "register");
        assert_eq!(page["viewer"]["state"], "anonymous");

        let admin = register(&server, "root@example.com").await;
        let page: Value = server.get("/login").add_cookie(admin.clone()).await.json();
        assert_eq!(page["form"], "login");
        assert_eq!(page["viewer"]["state"], "authenticated");

        let page: Value = server
            .get("/admin/campaigns/new")
            .add_cookie(admin)
            .await
            .json();
        assert_eq!(page["form"], "new_campaign");
        Ok(())
    }

    #[tokio::test]
    async fn responses_carry_request_id() -> Result<()> {
        let server = test_server();
        let response = server.get("/health").await;
        let generated = response.header("x-request-id");
        assert!(!generated.is_empty());

        let echoed = server
            .get("/health")
            .add_header("x-request-id", "req-42")
            .await;
        assert_eq!(echoed.header("x-request-id"), "req-42");
        Ok(())
    }
}
