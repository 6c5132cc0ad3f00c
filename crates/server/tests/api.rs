use db::DBService;
use serde_json::{Value, json};
use server::AppState;
use services::services::assistant::AssistantService;

struct TestApp {
    base: String,
    client: reqwest::Client,
}

impl TestApp {
    async fn spawn() -> Self {
        let db = DBService::new_in_memory().await.unwrap();
        let state = AppState::with_assistant(db, AssistantService::canned());
        let app = server::router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}/api"),
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let res = self
            .client
            .post(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status().as_u16();
        (status, res.json().await.unwrap())
    }

    async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        let res = self
            .client
            .put(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status().as_u16();
        (status, res.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let res = self
            .client
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .unwrap();
        let status = res.status().as_u16();
        (status, res.json().await.unwrap())
    }

    async fn delete(&self, path: &str) -> (u16, Value) {
        let res = self
            .client
            .delete(format!("{}{path}", self.base))
            .send()
            .await
            .unwrap();
        let status = res.status().as_u16();
        (status, res.json().await.unwrap())
    }

    async fn create_survey(&self, title: &str) -> String {
        let (status, body) = self
            .post("/surveys", json!({ "title": title, "description": null }))
            .await;
        assert_eq!(status, 200);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_section(&self, survey_id: &str, phase: &str, title: &str) -> String {
        let (status, body) = self
            .post(
                &format!("/surveys/{survey_id}/sections"),
                json!({ "phase": phase, "title": title }),
            )
            .await;
        assert_eq!(status, 200);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_question(&self, section_id: &str, text: &str) -> String {
        let (status, body) = self
            .post(
                &format!("/sections/{section_id}/questions"),
                json!({ "text": text }),
            )
            .await;
        assert_eq!(status, 200);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn survey_create_requires_a_title() {
    let app = TestApp::spawn().await;

    let (status, body) = app.post("/surveys", json!({ "title": "  " })).await;
    assert_eq!(status, 422);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "survey title is required");

    let (status, body) = app
        .post("/surveys", json!({ "title": "Brand tracker" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["title"], "Brand tracker");
}

#[tokio::test]
async fn survey_tree_partitions_sections_by_phase() {
    let app = TestApp::spawn().await;
    let survey_id = app.create_survey("Usage study").await;

    app.create_section(&survey_id, "screening", "Qualify").await;
    app.create_section(&survey_id, "main", "Habits").await;

    let (status, body) = app.get(&format!("/surveys/{survey_id}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["screening"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["main"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["screening"][0]["title"], "Qualify");
}

#[tokio::test]
async fn questions_are_numbered_in_section_major_order() {
    let app = TestApp::spawn().await;
    let survey_id = app.create_survey("Numbering").await;
    let section_a = app.create_section(&survey_id, "main", "A").await;
    let section_b = app.create_section(&survey_id, "main", "B").await;

    app.create_question(&section_a, "First").await;
    app.create_question(&section_a, "Second").await;
    app.create_question(&section_b, "Third").await;

    let (status, body) = app.get(&format!("/surveys/{survey_id}/questions")).await;
    assert_eq!(status, 200);
    let numbers: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["question_number"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec!["Q1", "Q2", "Q3"]);
}

#[tokio::test]
async fn reorder_moves_a_question_into_another_section_and_renumbers() {
    let app = TestApp::spawn().await;
    let survey_id = app.create_survey("Reorder").await;
    let section_a = app.create_section(&survey_id, "main", "A").await;
    let section_b = app.create_section(&survey_id, "main", "B").await;

    app.create_question(&section_a, "First").await;
    let q2 = app.create_question(&section_a, "Second").await;
    app.create_question(&section_b, "Third").await;

    // Drop Q2 onto section B: appended at the end, everything renumbered.
    let (status, body) = app
        .post(
            &format!("/surveys/{survey_id}/phases/main/reorder"),
            json!({ "active_id": q2, "over_id": section_b }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["outcome"]["kind"], "moved");

    let sections = body["data"]["sections"].as_array().unwrap();
    assert_eq!(sections[0]["questions"].as_array().unwrap().len(), 1);
    let b_questions = sections[1]["questions"].as_array().unwrap();
    assert_eq!(b_questions.len(), 2);
    assert_eq!(b_questions[1]["id"], q2.as_str());
    assert_eq!(b_questions[0]["question_number"], "Q2");
    assert_eq!(b_questions[1]["question_number"], "Q3");
}

#[tokio::test]
async fn reorder_onto_self_is_reported_as_ignored() {
    let app = TestApp::spawn().await;
    let survey_id = app.create_survey("Reorder noop").await;
    let section = app.create_section(&survey_id, "main", "A").await;
    let q1 = app.create_question(&section, "Only").await;

    let (status, body) = app
        .post(
            &format!("/surveys/{survey_id}/phases/main/reorder"),
            json!({ "active_id": q1, "over_id": q1 }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["outcome"]["kind"], "ignored");
    assert_eq!(body["data"]["outcome"]["reason"], "self_target");
}

#[tokio::test]
async fn fixed_questions_cannot_be_deleted() {
    let app = TestApp::spawn().await;
    let survey_id = app.create_survey("Fixed").await;
    let section = app.create_section(&survey_id, "screening", "Qualify").await;

    let (status, body) = app
        .post(
            &format!("/sections/{section}/questions"),
            json!({ "text": "Age?", "is_fixed": true }),
        )
        .await;
    assert_eq!(status, 200);
    let question_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.delete(&format!("/questions/{question_id}")).await;
    assert_eq!(status, 409);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn thread_listing_falls_back_to_samples_until_one_is_created() {
    let app = TestApp::spawn().await;
    let survey_id = app.create_survey("Threads").await;
    let section = app.create_section(&survey_id, "main", "A").await;
    let question_id = app.create_question(&section, "First").await;

    let (status, body) = app.get(&format!("/surveys/{survey_id}/threads")).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"].as_array().unwrap().len(), 4);

    let (status, body) = app
        .post(
            &format!("/surveys/{survey_id}/threads"),
            json!({
                "question_id": question_id,
                "message": "Wording is ambiguous",
                "created_by": "reviewer",
                "thread_type": "team"
            }),
        )
        .await;
    assert_eq!(status, 200);
    let thread_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = app.get(&format!("/surveys/{survey_id}/threads")).await;
    let threads = body["data"].as_array().unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0]["id"], thread_id.as_str());

    // Filtered projections.
    let (_, body) = app
        .get(&format!("/surveys/{survey_id}/threads?type=ai"))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    let (_, body) = app
        .get(&format!(
            "/surveys/{survey_id}/threads?type=team&status=unresolved"
        ))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn thread_toggle_is_an_involution_and_replies_append() {
    let app = TestApp::spawn().await;
    let survey_id = app.create_survey("Toggle").await;
    let section = app.create_section(&survey_id, "main", "A").await;
    let question_id = app.create_question(&section, "First").await;

    let (_, body) = app
        .post(
            &format!("/surveys/{survey_id}/threads"),
            json!({
                "question_id": question_id,
                "message": "Check the scale",
                "created_by": "reviewer",
                "thread_type": null
            }),
        )
        .await;
    let thread_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(&format!("/threads/{thread_id}/toggle"), json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["is_completed"], true);
    assert_eq!(body["data"]["mutation"], "committed");

    let (_, body) = app
        .post(&format!("/threads/{thread_id}/toggle"), json!({}))
        .await;
    assert_eq!(body["data"]["is_completed"], false);

    let (status, body) = app
        .post(
            &format!("/threads/{thread_id}/reviews"),
            json!({ "message": "Done", "created_by": "author" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["message"], "Done");

    let (status, body) = app
        .post(
            "/threads/00000000-0000-0000-0000-000000000000/reviews",
            json!({ "message": "orphan", "created_by": "author" }),
        )
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_run_starts_and_gates_proceed_while_running() {
    let app = TestApp::spawn().await;
    let survey_id = app.create_survey("Test run").await;

    let (_, body) = app.get(&format!("/surveys/{survey_id}/test-run")).await;
    assert_eq!(body["data"]["state"], "idle");
    assert_eq!(body["data"]["can_proceed"], false);

    let (status, body) = app
        .post(&format!("/surveys/{survey_id}/test-run"), json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["state"], "running");
    assert_eq!(body["data"]["can_proceed"], false);
}

#[tokio::test]
async fn session_lifecycle_selection_and_close() {
    let app = TestApp::spawn().await;
    let survey_id = app.create_survey("Session").await;

    let (status, body) = app.get(&format!("/surveys/{survey_id}/session")).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["selected_thread"], Value::Null);

    let thread_id = "2d9f8f5e-54f4-4f52-9257-2d0f6c2f6c11";
    let (_, body) = app
        .put(
            &format!("/surveys/{survey_id}/session/selection"),
            json!({ "thread_id": thread_id }),
        )
        .await;
    assert_eq!(body["data"]["selected_thread"], thread_id);

    let (_, body) = app
        .put(
            &format!("/surveys/{survey_id}/session/selection"),
            json!({ "thread_id": null }),
        )
        .await;
    assert_eq!(body["data"]["selected_thread"], Value::Null);

    let (_, body) = app
        .put(
            &format!("/surveys/{survey_id}/session/filters"),
            json!({ "type": "team", "status": "unresolved" }),
        )
        .await;
    assert_eq!(body["data"]["type_filter"], "team");
    assert_eq!(body["data"]["status_filter"], "unresolved");

    let (status, body) = app.delete(&format!("/surveys/{survey_id}/session")).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"], true);
    let (_, body) = app.delete(&format!("/surveys/{survey_id}/session")).await;
    assert_eq!(body["data"], false);
}

#[tokio::test]
async fn chat_round_trip_with_canned_assistant() {
    let app = TestApp::spawn().await;
    let survey_id = app.create_survey("Chat").await;

    let (status, body) = app
        .post(&format!("/surveys/{survey_id}/chat"), json!({ "message": "" }))
        .await;
    assert_eq!(status, 422);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .post(
            &format!("/surveys/{survey_id}/chat"),
            json!({ "message": "How does the flow look?" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["role"], "assistant");
    assert!(!body["data"]["content"].as_str().unwrap().is_empty());

    let (_, body) = app.get(&format!("/surveys/{survey_id}/chat")).await;
    let transcript = body["data"].as_array().unwrap();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0]["role"], "user");
    assert_eq!(transcript[1]["role"], "assistant");
}
