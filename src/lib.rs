pub mod api;
pub mod auth;
pub mod bridge;
pub mod error;
pub mod models;
pub mod notify;
pub mod payments;
pub mod scoring;
pub mod session;
pub mod store;
pub mod timer;
pub mod validate;


// Re-exports for convenience
pub use api::{ApiClient, ApiConfig};
pub use auth::{AuthEvent, AuthSession, AuthState, Authenticator};
pub use bridge::{spawn_submit_worker, SubmitJob, SubmitOutcome};
pub use error::{
    ApiError, ClientError, ErrorCode, SessionError, StoreError, ValidationError,
};
pub use models::{
    Answer, AnswerOption, Question, QuestionKind, Quiz, QuizSettings, Role, UserProfile,
};
pub use notify::{
    spawn_listener, Notification, NotificationHub, NotificationKind, NotificationSource,
    Subscription, WsSource,
};
pub use scoring::{grade, QuestionResult, ScoreReport};
pub use session::{SessionState, SubmitStatus, TimeoutOutcome};
pub use store::Store;
pub use timer::{QuestionTimer, TimerEvent};
pub use validate::RegistrationForm;
