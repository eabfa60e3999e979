use crate::auth::{user_id_from_token, TokenProvider};
use crate::cancel::CancelToken;
use crate::community::{Community, CommunityList, NewCommunity};
use crate::config::ClientConfig;
use crate::error::{ErrorBody, Result, SharpError};
use crate::question::{Question, QuestionList, QuestionPayload, RawQuestion};
use crate::quiz::{NormalizedQuiz, Quiz, QuizDocument, QuizEnvelope, QuizList};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Copy)]
enum Api {
    Community,
    Quiz,
}

#[derive(Clone)]
pub struct SharpClient {
    http: reqwest::Client,
    config: ClientConfig,
    tokens: Arc<dyn TokenProvider>,
    cancel: CancelToken,
}

impl SharpClient {
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            tokens,
            cancel: CancelToken::none(),
        })
    }

    pub fn with_cancel(&self, cancel: CancelToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    pub async fn current_user_id(&self) -> Option<String> {
        let token = self.tokens.id_token().await?;
        user_id_from_token(&token)
    }

    pub async fn list_communities(&self) -> Result<Vec<Community>> {
        let list: CommunityList = self.call(Method::GET, Api::Community, &["communities", ""], None::<&()>).await?;
        Ok(list.communities)
    }

    pub async fn create_community(&self, community: &NewCommunity) -> Result<Community> {
        self.call(Method::POST, Api::Community, &["communities", ""], Some(community)).await
    }

    pub async fn get_community(&self, community_id: &str) -> Result<Community> {
        self.call(Method::GET, Api::Community, &["communities", community_id], None::<&()>).await
    }

    pub async fn join_community(&self, community_id: &str) -> Result<Community> {
        self.call(Method::POST, Api::Community, &["communities", community_id, "members"], None::<&()>)
            .await
    }

    pub async fn leave_community(&self, community_id: &str) -> Result<Community> {
        self.call(Method::DELETE, Api::Community, &["communities", community_id, "members"], None::<&()>)
            .await
    }

    pub async fn list_quizzes(&self, community_id: &str) -> Result<Vec<Quiz>> {
        let list: QuizList = self
            .call(Method::GET, Api::Quiz, &["community", community_id, "quizzes", ""], None::<&()>)
            .await?;
        Ok(list.quizzes.into_iter().map(|r| Quiz::from_record(r).quiz).collect())
    }

    pub async fn create_quiz(&self, quiz: &QuizDocument) -> Result<NormalizedQuiz> {
        let envelope: QuizEnvelope = self
            .call(Method::POST, Api::Quiz, &["community", &quiz.community_id, "quizzes", ""], Some(quiz))
            .await?;
        Ok(Quiz::from_envelope(envelope))
    }

    pub async fn get_quiz(&self, community_id: &str, quiz_id: &str) -> Result<NormalizedQuiz> {
        let envelope: QuizEnvelope = self
            .call(Method::GET, Api::Quiz, &["community", community_id, "quizzes", quiz_id], None::<&()>)
            .await?;
        Ok(Quiz::from_envelope(envelope))
    }

    pub async fn update_quiz(&self, quiz: &QuizDocument) -> Result<NormalizedQuiz> {
        let envelope: QuizEnvelope = self
            .call(Method::PUT, Api::Quiz, &["quizzes", &quiz.community_id, &quiz.quiz_id], Some(quiz))
            .await?;
        Ok(Quiz::from_envelope(envelope))
    }

    pub async fn delete_quiz(&self, community_id: &str, quiz_id: &str) -> Result<()> {
        self.call_empty(Method::DELETE, Api::Quiz, &["community", community_id, "quizzes", quiz_id])
            .await
    }

    pub async fn list_questions(&self, community_id: &str, quiz_id: &str) -> Result<Vec<RawQuestion>> {
        let list: QuestionList = self
            .call(
                Method::GET,
                Api::Quiz,
                &["community", community_id, "quizzes", quiz_id, "questions"],
                None::<&()>,
            )
            .await?;
        Ok(list.questions)
    }

    pub async fn get_question(&self, community_id: &str, quiz_id: &str, question_id: &str) -> Result<Question> {
        let raw: RawQuestion = self
            .call(
                Method::GET,
                Api::Quiz,
                &["community", community_id, "quizzes", quiz_id, "questions", question_id],
                None::<&()>,
            )
            .await?;
        Question::try_from(raw)
    }

    pub async fn create_question(&self, community_id: &str, quiz_id: &str, question: &Question) -> Result<Question> {
        let payload = QuestionPayload {
            community_id: community_id.to_string(),
            quiz_id: quiz_id.to_string(),
            question: question.to_raw(),
        };
        let raw: RawQuestion = self
            .call(
                Method::POST,
                Api::Quiz,
                &["community", community_id, "quizzes", quiz_id, "questions"],
                Some(&payload),
            )
            .await?;
        Question::try_from(raw)
    }

    pub async fn update_question(&self, community_id: &str, quiz_id: &str, question: &Question) -> Result<Question> {
        let payload = QuestionPayload {
            community_id: community_id.to_string(),
            quiz_id: quiz_id.to_string(),
            question: question.to_raw(),
        };
        let raw: RawQuestion = self
            .call(
                Method::PUT,
                Api::Quiz,
                &["community", community_id, "quizzes", quiz_id, "questions", &question.id],
                Some(&payload),
            )
            .await?;
        Question::try_from(raw)
    }

    pub async fn delete_question(&self, community_id: &str, quiz_id: &str, question_id: &str) -> Result<()> {
        self.call_empty(
            Method::DELETE,
            Api::Quiz,
            &["community", community_id, "quizzes", quiz_id, "questions", question_id],
        )
        .await
    }

    fn url(&self, api: Api, segments: &[&str]) -> Result<Url> {
        let base = match api {
            Api::Community => &self.config.community_api,
            Api::Quiz => &self.config.quiz_api,
        };
        let invalid = |message: String| SharpError::NetworkFailure { status: None, message };
        let mut url = Url::parse(base).map_err(|e| invalid(format!("invalid base url {base:?}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("base url {base:?} cannot carry a path")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request(&self, method: Method, api: Api, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.url(api, segments)?;
        let builder = self.http.request(method, url);
        match self.tokens.id_token().await {
            Some(token) => Ok(builder.bearer_auth(token)),
            None if self.config.allow_anonymous => {
                debug!("no identity token, sending request anonymously");
                Ok(builder)
            }
            None => Err(SharpError::Unauthenticated),
        }
    }

    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        api: Api,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<Response> {
        self.cancel
            .run(async {
                let mut builder = self.request(method, api, segments).await?;
                if let Some(body) = body {
                    builder = builder.json(body);
                }
                let response = builder.send().await?;
                check_status(response).await
            })
            .await
    }

    async fn call<T, B>(&self, method: Method, api: Api, segments: &[&str], body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.execute(method, api, segments, body).await?;
        let bytes = self.cancel.run(async { Ok(response.bytes().await?) }).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn call_empty(&self, method: Method, api: Api, segments: &[&str]) -> Result<()> {
        self.execute(method, api, segments, None::<&()>).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => format!("{}: {}", body.error.code, body.error.message),
        Err(_) if text.trim().is_empty() => status.to_string(),
        Err(_) => text,
    };
    warn!(%url, status = status.as_u16(), "api request failed: {}", message);
    Err(SharpError::NetworkFailure {
        status: Some(status.as_u16()),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Anonymous, StaticToken};

    fn client(base: &str) -> SharpClient {
        SharpClient::new(ClientConfig::single(base), Arc::new(Anonymous)).unwrap()
    }

    #[test]
    fn urls_keep_trailing_slashes_and_escape_ids() {
        let c = client("http://api.local/prod/");
        let url = c.url(Api::Community, &["communities", ""]).unwrap();
        assert_eq!(url.as_str(), "http://api.local/prod/communities/");
        let url = c.url(Api::Quiz, &["community", "a b", "quizzes", "q/1"]).unwrap();
        assert_eq!(url.as_str(), "http://api.local/prod/community/a%20b/quizzes/q%2F1");
    }

    #[test]
    fn invalid_base_url_is_a_network_failure() {
        let c = client("not a url");
        assert!(matches!(
            c.url(Api::Quiz, &["quizzes"]),
            Err(SharpError::NetworkFailure { status: None, .. })
        ));
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let c = client("http://127.0.0.1:9");
        let err = c.list_communities().await.unwrap_err();
        assert!(matches!(err, SharpError::Unauthenticated));
    }

    #[tokio::test]
    async fn current_user_comes_from_token() {
        let token = crate::auth::unsigned_token("alice");
        let c = SharpClient::new(ClientConfig::single("http://127.0.0.1:9"), Arc::new(StaticToken(token))).unwrap();
        assert_eq!(c.current_user_id().await.as_deref(), Some("alice"));
        assert_eq!(client("http://127.0.0.1:9").current_user_id().await, None);
    }
}
