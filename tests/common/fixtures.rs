//! Mock board service fixtures

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::API_KEY;

/// Mount `GET /1/boards/{board}/lists` answering with `lists` as `(id, name)` pairs
pub async fn mount_lists(server: &MockServer, board: &str, token: &str, lists: &[(&str, &str)]) {
    let body: Vec<Value> = lists
        .iter()
        .map(|(id, name)| json!({ "id": id, "name": name, "closed": false, "idBoard": board }))
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("/1/boards/{board}/lists")))
        .and(query_param("key", API_KEY))
        .and(query_param("token", token))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount `GET /1/lists/{list}/cards` answering with `cards`
pub async fn mount_cards(server: &MockServer, list: &str, cards: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/1/lists/{list}/cards")))
        .and(query_param("attachments", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cards))
        .mount(server)
        .await;
}

/// Mount an attachment download and return its URL
pub async fn mount_attachment(
    server: &MockServer,
    id: &str,
    content_type: &str,
    bytes: &[u8],
) -> String {
    Mock::given(method("GET"))
        .and(path(format!("/attachments/{id}")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", content_type)
                .set_body_bytes(bytes.to_vec()),
        )
        .mount(server)
        .await;
    format!("{}/attachments/{id}", server.uri())
}

/// A card without attachments
pub fn card(id: &str, name: &str, desc: &str) -> Value {
    json!({ "id": id, "name": name, "desc": desc, "attachments": [] })
}

/// A card with one uploaded attachment
pub fn card_with_file(id: &str, name: &str, file_name: &str, mime: &str, url: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "desc": "",
        "attachments": [{
            "id": format!("{id}-file"),
            "name": file_name,
            "url": url,
            "mimeType": mime,
            "isUpload": true
        }]
    })
}

/// Mount a full course board: course, two sections, three lessons and a test
pub async fn mount_course_board(server: &MockServer, board: &str, token: &str) {
    let cover = mount_attachment(server, "cover", "image/png", b"\x89PNG cover").await;
    let handout = mount_attachment(server, "handout", "application/pdf", b"%PDF-1.7 handout").await;

    mount_lists(
        server,
        board,
        token,
        &[
            ("course", "[Course] Intro to Rust"),
            ("s1", "[Section] Basics"),
            ("s1l1", "[Lesson] Ownership"),
            ("s1l2", "[Lesson] Borrowing"),
            ("s2", "[SECTION] Concurrency"),
            ("s2l1", "[lesson] Threads"),
            ("quiz", "[Test] Checkpoint"),
            ("misc", "Ideas backlog"),
        ],
    )
    .await;

    mount_cards(
        server,
        "course",
        json!([
            card("c1", "[Description]", "A first course"),
            card_with_file("c2", "[Image] Cover", "cover.png", "image/png", &cover),
        ]),
    )
    .await;
    mount_cards(server, "s1", json!([card("c3", "[Description]", "Memory model")])).await;
    mount_cards(
        server,
        "s1l1",
        json!([
            card("c4", "[Description] Rules", "Each value has one owner"),
            card("c5", "[Video] Talk", "https://videos.example/ownership"),
            card_with_file("c6", "[PDF] Handout", "handout.pdf", "application/pdf", &handout),
        ]),
    )
    .await;
    mount_cards(server, "s1l2", json!([])).await;
    mount_cards(server, "s2", json!([])).await;
    mount_cards(server, "s2l1", json!([card("c7", "[Description]", "Spawning")])).await;
    mount_cards(
        server,
        "quiz",
        json!([
            card("q1", "Marks: 60", ""),
            card("q2", "Who owns a moved value?", "The receiver"),
        ]),
    )
    .await;
}
