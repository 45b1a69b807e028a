//! Fixtures shared by the unit tests.

use rusqlite::Connection;

use crate::projects::{CreateProjectRequest, GuestRequest, PayCheckPointRequest};
use crate::users::{self, CreateUserRequest};

/// Create an account with password `secret1` and return its id.
pub fn seed_user(conn: &Connection, email: &str, phone: &str) -> i64 {
    users::create_user(
        conn,
        &CreateUserRequest {
            email: email.to_string(),
            name: Some("Designer".to_string()),
            phone: phone.to_string(),
            password: "secret1".to_string(),
        },
    )
    .unwrap()
    .id
}

/// A project with one guest and two payment checkpoints.
pub fn sample_project() -> CreateProjectRequest {
    CreateProjectRequest {
        name: "Album cover".to_string(),
        description: Some("Front and back cover art".to_string()),
        guests: vec![GuestRequest {
            name: "Client".to_string(),
            email: "client@example.com".to_string(),
            phone: "010-9876-5432".to_string(),
        }],
        pay_check_points: vec![
            PayCheckPointRequest {
                pay_date: "2025-04-01".to_string(),
                price: 300_000,
                label: "Balance".to_string(),
            },
            PayCheckPointRequest {
                pay_date: "2025-03-01".to_string(),
                price: 200_000,
                label: "Deposit".to_string(),
            },
        ],
        start_date: Some("2025-03-01".to_string()),
        deadline: Some("2025-04-30T18:00:00+09:00".to_string()),
        total_price: Some(500_000),
        original_file_provided: Some(true),
        mod_limit: Some(3),
        additional_mod_fee: Some(50_000),
        ..Default::default()
    }
}

/// Invitation code of the first guest on `project_id`.
pub fn first_guest_code(conn: &Connection, project_id: i64) -> String {
    conn.query_row(
        "SELECT code FROM invitations WHERE project_id = ?1 ORDER BY id LIMIT 1",
        [project_id],
        |row| row.get(0),
    )
    .unwrap()
}
