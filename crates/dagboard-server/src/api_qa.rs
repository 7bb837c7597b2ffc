//! Question-answering endpoint.
//!
//! There is no retrieval or model behind this yet. The answer echoes the
//! inputs in a fixed template and never touches the database, so it works
//! for ids that were never saved.

use axum::{extract::Query, Json};
use serde::{Deserialize, Serialize};

/// Query string of `POST /api/ai-qa`.
#[derive(Debug, Deserialize)]
pub struct QaParams {
    pub dag_id: String,
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QaAnswer {
    pub answer: String,
}

/// Builds the placeholder answer for `question` about `dag_id`.
pub fn answer_question(dag_id: &str, question: &str) -> QaAnswer {
    QaAnswer {
        answer: format!("[mock answer] DAG({dag_id}) question: {question}"),
    }
}

/// Handler for `POST /api/ai-qa?dag_id=&question=`.
pub async fn ai_qa_handler(Query(params): Query<QaParams>) -> Json<QaAnswer> {
    tracing::debug!(dag_id = %params.dag_id, "answering with placeholder");
    Json(answer_question(&params.dag_id, &params.question))
}
