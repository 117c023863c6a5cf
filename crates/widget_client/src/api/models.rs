use serde::{Deserialize, Serialize};
use widget_core::{AuthCredential, HistorySession};

// ========== Requests ==========

/// Body of send-otp and resend-otp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendOtpRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub client_id: String,
    pub query: String,
    pub session_id: String,
}

// ========== Responses ==========

/// `{ success, message? }` as returned by send-otp and resend-otp.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VerifyOtpResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserInfo>,
    #[serde(default)]
    pub message: Option<String>,
}

impl VerifyOtpResponse {
    /// The issued credential. A success without both a token and an email
    /// does not count.
    pub fn credential(&self) -> Option<AuthCredential> {
        if !self.success {
            return None;
        }
        let token = self.token.as_deref().filter(|t| !t.is_empty())?;
        let email = non_empty_email(self.user.as_ref())?;
        Some(AuthCredential::new(token, email))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VerifyTokenResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub user: Option<UserInfo>,
    #[serde(default)]
    pub message: Option<String>,
}

impl VerifyTokenResponse {
    pub fn verified_email(&self) -> Option<String> {
        if !self.success {
            return None;
        }
        non_empty_email(self.user.as_ref()).map(str::to_string)
    }
}

fn non_empty_email(user: Option<&UserInfo>) -> Option<&str> {
    user?.email.as_deref().filter(|e| !e.is_empty())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistoryResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub history: Option<Vec<HistorySession>>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A suggested question: a bare string or an object from the retrieval index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SuggestionItem {
    Text(String),
    Question {
        #[serde(default)]
        question: Option<String>,
        #[serde(default, rename = "originalQuestion")]
        original_question: Option<String>,
    },
}

impl SuggestionItem {
    /// Clickable label, if the entry carries one.
    pub fn label(&self) -> Option<&str> {
        let label = match self {
            SuggestionItem::Text(text) => Some(text.as_str()),
            SuggestionItem::Question {
                question,
                original_question,
            } => question.as_deref().or(original_question.as_deref()),
        };
        label.map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Chat endpoint payload. The backend has two response shapes: a search
/// result with `answer`, and a widget reply with `success` + `response`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub suggestions: Option<Vec<SuggestionItem>>,
    #[serde(default)]
    pub suggested_questions: Option<Vec<SuggestionItem>>,
    #[serde(default)]
    pub related_questions: Option<Vec<SuggestionItem>>,
    #[serde(default)]
    pub recommended_questions: Option<Vec<SuggestionItem>>,
    #[serde(default)]
    pub similar_questions: Option<Vec<SuggestionItem>>,
    #[serde(default)]
    pub follow_up_questions: Option<Vec<String>>,
}

/// What the pipeline shows for one chat response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReply {
    pub answer: String,
    pub suggestions: Vec<String>,
    pub follow_ups: Vec<String>,
}

impl ChatResponse {
    /// Answer text: a non-empty `answer`, else `response` when `success`.
    pub fn answer_text(&self) -> Option<&str> {
        let answer = self.answer.as_deref().filter(|a| !a.is_empty());
        answer.or_else(|| {
            if self.success {
                self.response.as_deref().filter(|r| !r.is_empty())
            } else {
                None
            }
        })
    }

    /// Labels from the first suggestion field that yields any.
    pub fn suggestion_labels(&self) -> Vec<String> {
        [
            &self.suggestions,
            &self.suggested_questions,
            &self.related_questions,
            &self.recommended_questions,
            &self.similar_questions,
        ]
        .into_iter()
        .flatten()
        .map(|items| {
            items
                .iter()
                .filter_map(SuggestionItem::label)
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .find(|labels| !labels.is_empty())
        .unwrap_or_default()
    }

    pub fn follow_up_labels(&self) -> Vec<String> {
        self.follow_up_questions
            .iter()
            .flatten()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// `None` when the payload has nothing to show.
    pub fn resolve(&self) -> Option<ResolvedReply> {
        let answer = self.answer_text()?.to_string();
        Some(ResolvedReply {
            answer,
            suggestions: self.suggestion_labels(),
            follow_ups: self.follow_up_labels(),
        })
    }
}
