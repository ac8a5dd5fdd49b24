/*!
The session store: one authenticated identity per running process.

Signup and login mutate a durable registry of users and a single
durable session slot; the active session is whatever that slot held the
last time it was written. Operations take `&mut self` because none of
them is safe for two actors at once; a process wanting shared access
wraps the store in its own lock. Two *processes* sharing the same
storage are not coordinated at all; a race between them can defeat the
uniqueness checks, which is an accepted weakness of this kind of
local-storage-backed identity.
*/
use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{self, AuthResult, Salter, MIN_PASSWORD_LEN};
use crate::config::Cfg;
use crate::storage::{FileStorage, Storage, StorageError};
use crate::user::{Role, Session, User};

pub(crate) const USERS_KEY: &str = "campus.users";
pub(crate) const SESSION_KEY: &str = "campus.session";

static BAD_LOGIN_MESSAGE: &str = "Invalid username/password combination.";

/// Fixed demonstration accounts seeded into an empty registry:
/// (uname, email, name, role, grade).
static DEMO_USERS: &[(&str, &str, &str, Role, Option<&str>)] = &[
    ("admin", "admin@example.com", "Demo Admin", Role::Admin, None),
    ("teacher", "teacher@example.com", "Demo Teacher", Role::Teacher, None),
    ("student", "student@example.com", "Demo Student", Role::Student, Some("FIRST")),
];
static DEMO_PASSWORD: &str = "password123";

#[derive(Debug, PartialEq)]
pub enum SessionError {
    /// Malformed signup input. Nothing was written.
    Validation(String),
    /// Signup uname/email collision with an extant registry entry.
    /// Nothing was written.
    Conflict(String),
    /// Login failed. Deliberately carries no hint of whether the
    /// account exists.
    BadLogin,
    /// The registry could not be read or written.
    Storage(StorageError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SessionError::Validation(msg) => write!(f, "{}", msg),
            SessionError::Conflict(msg) => write!(f, "{}", msg),
            SessionError::BadLogin => write!(f, "{}", BAD_LOGIN_MESSAGE),
            SessionError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl From<StorageError> for SessionError {
    fn from(e: StorageError) -> SessionError { SessionError::Storage(e) }
}

/// Everything a signup form submits.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub uname: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
    pub grade: Option<String>,
}

pub struct SessionStore {
    storage: Arc<dyn Storage>,
    salter: Salter,
    session: Option<Session>,
    loading: bool,
    seed_demo: bool,
}

impl SessionStore {
    /// A store over the given storage. Call [`initialize()`] before
    /// anything else; until then the store reports itself loading and
    /// logged out.
    ///
    /// [`initialize()`]: SessionStore::initialize
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        log::trace!("SessionStore::new(...) called.");

        Self {
            storage,
            salter: Salter::new(),
            session: None,
            loading: true,
            seed_demo: true,
        }
    }

    /// A store over file-backed storage at the configured path.
    pub fn from_config(cfg: &Cfg) -> Self {
        log::trace!("SessionStore::from_config( {:?} ) called.", cfg);

        let mut store = Self::new(Arc::new(FileStorage::new(&cfg.storage_path)));
        store.seed_demo = cfg.seed_demo_users;
        store
    }

    /// Whether `initialize()` should seed demonstration users into an
    /// empty registry. On by default.
    pub fn set_seed_demo_users(&mut self, seed: bool) {
        self.seed_demo = seed;
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The signup/login loading bracket, for callers that show a
    /// spinner. Has no bearing on correctness.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /**
    Bring the store to its ready state.

    Seeds the fixed demonstration users if the registry is empty, then
    resumes whatever session the slot holds. Nothing here raises: a
    malformed session slot is cleared and treated as "logged out", a
    malformed registry is left untouched (seeding never clobbers), and
    storage failures degrade to "logged out" with a warning. Ends with
    `is_loading() == false` in every case.
    */
    pub async fn initialize(&mut self) {
        log::trace!("SessionStore::initialize() called.");

        if self.seed_demo {
            if let Err(e) = self.seed_demo_users().await {
                log::warn!("Unable to seed demonstration users: {}", &e);
            }
        }

        match self.storage.get_item(SESSION_KEY).await {
            Ok(None) => {
                self.session = None;
            },
            Ok(Some(raw)) => match serde_json::from_str::<Session>(&raw) {
                Ok(session) => {
                    log::trace!("Resuming session for {:?}.", &session.uname);
                    self.session = Some(session);
                },
                Err(e) => {
                    log::warn!(
                        "Persisted session is unreadable ({}); discarding it.",
                        &e
                    );
                    if let Err(e) = self.storage.remove_item(SESSION_KEY).await {
                        log::warn!("Unable to clear unreadable session slot: {}", &e);
                    }
                    self.session = None;
                },
            },
            Err(e) => {
                log::warn!(
                    "Unable to read persisted session ({}); starting logged out.",
                    &e
                );
                self.session = None;
            },
        }

        self.loading = false;
    }

    /**
    Register a new user and make them the active session.

    Checks run before anything is written, so a failure of any kind
    leaves both the registry and the session slot exactly as they were:
      * the two password fields must match;
      * the password must be at least `MIN_PASSWORD_LEN` characters;
      * a student must come with a grade;
      * the uname and email must both be new to the registry (either
        collision is the same conflict).
    */
    pub async fn sign_up(&mut self, new: NewUser) -> Result<Session, SessionError> {
        log::trace!("SessionStore::sign_up( {:?} ) called.", &new.uname);

        self.loading = true;
        let res = self.sign_up_inner(new).await;
        self.loading = false;
        res
    }

    async fn sign_up_inner(&mut self, new: NewUser) -> Result<Session, SessionError> {
        if new.password != new.confirm_password {
            return Err(SessionError::Validation(
                "Passwords do not match.".to_owned()
            ));
        }
        if new.password.len() < MIN_PASSWORD_LEN {
            return Err(SessionError::Validation(format!(
                "Passwords must be at least {} characters long.",
                MIN_PASSWORD_LEN
            )));
        }
        if new.role == Role::Student && new.grade.is_none() {
            return Err(SessionError::Validation(
                "Students must select a grade.".to_owned()
            ));
        }

        let mut users = self.load_registry().await?;
        if users.iter().any(|u| u.uname == new.uname || u.email == new.email) {
            return Err(SessionError::Conflict(format!(
                "A user with uname {:?} or email {:?} already exists.",
                &new.uname, &new.email
            )));
        }

        let user = self.build_user(
            &new.name,
            &new.uname,
            &new.email,
            &new.password,
            new.role,
            new.grade,
        );
        let session = Session::from(&user);
        users.push(user);

        self.save_registry(&users).await?;
        self.persist_session(&session).await?;

        log::trace!("Signed up new {} {:?}.", session.role, &session.uname);
        Ok(session)
    }

    /**
    Authenticate and make the found user the active session,
    overwriting whatever session was there before.

    `ident` may be either an email address or a uname; email matches
    are checked before uname matches, so an identifier that is one
    user's email and another user's uname resolves to the email match.

    A missing account and a wrong password produce the same error;
    callers (and their users) cannot tell which it was.
    */
    pub async fn login(&mut self, ident: &str, password: &str) -> Result<Session, SessionError> {
        log::trace!("SessionStore::login( {:?} ) called.", ident);

        self.loading = true;
        let res = self.login_inner(ident, password).await;
        self.loading = false;
        res
    }

    async fn login_inner(&mut self, ident: &str, password: &str) -> Result<Session, SessionError> {
        let users = self.load_registry().await?;
        let found = users.iter()
            .find(|u| u.email == ident)
            .or_else(|| users.iter().find(|u| u.uname == ident));

        match auth::check_password(found, password) {
            AuthResult::Ok => {
                // The good path; fall through to session creation.
            },
            res => {
                log::trace!("Login as {:?} failed: {:?}.", ident, &res);
                return Err(SessionError::BadLogin);
            },
        }

        let user = match found {
            Some(u) => u,
            // check_password() only returns Ok when handed a user.
            None => { return Err(SessionError::BadLogin); },
        };

        let session = Session::from(user);
        self.persist_session(&session).await?;

        log::trace!("{:?} logged in.", &session.uname);
        Ok(session)
    }

    /// Clear the session slot and the active session. Never fails; a
    /// storage error still leaves the process logged out.
    pub async fn logout(&mut self) {
        log::trace!("SessionStore::logout() called.");

        if let Err(e) = self.storage.remove_item(SESSION_KEY).await {
            log::warn!(
                "Unable to clear persisted session ({}); clearing in-memory session anyway.",
                &e
            );
        }
        self.session = None;
    }

    fn build_user(
        &self,
        name: &str,
        uname: &str,
        email: &str,
        password: &str,
        role: Role,
        grade: Option<String>,
    ) -> User {
        let salt = self.salter.generate_salt();
        let digest = auth::derive_digest(password, &salt);

        User {
            id: Uuid::new_v4().to_string(),
            uname: uname.to_owned(),
            email: email.to_owned(),
            name: name.to_owned(),
            role,
            grade,
            salt,
            digest,
            created: OffsetDateTime::now_utc(),
        }
    }

    async fn seed_demo_users(&self) -> Result<(), StorageError> {
        let users = match self.storage.get_item(USERS_KEY).await? {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<Vec<User>>(&raw) {
                Ok(users) => users,
                Err(e) => {
                    // Never clobber a registry we merely can't read.
                    log::warn!(
                        "User registry is unreadable ({}); leaving it as-is.",
                        &e
                    );
                    return Ok(());
                },
            },
        };
        if !users.is_empty() {
            return Ok(());
        }

        log::info!(
            "User registry is empty; seeding {} demonstration users.",
            DEMO_USERS.len()
        );

        let mut seeded: Vec<User> = Vec::with_capacity(DEMO_USERS.len());
        for (uname, email, name, role, grade) in DEMO_USERS.iter() {
            seeded.push(self.build_user(
                name,
                uname,
                email,
                DEMO_PASSWORD,
                *role,
                grade.map(str::to_owned),
            ));
        }

        self.save_registry(&seeded).await
    }

    async fn load_registry(&self) -> Result<Vec<User>, StorageError> {
        match self.storage.get_item(USERS_KEY).await? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| StorageError::from(format!(
                    "User registry is unreadable: {}", &e
                ))),
        }
    }

    async fn save_registry(&self, users: &[User]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(users)
            .map_err(|e| StorageError::from(format!(
                "Unable to serialize user registry: {}", &e
            )))?;

        self.storage.set_item(USERS_KEY, &raw).await
    }

    async fn persist_session(&mut self, session: &Session) -> Result<(), StorageError> {
        let raw = serde_json::to_string(session)
            .map_err(|e| StorageError::from(format!(
                "Unable to serialize session: {}", &e
            )))?;

        self.storage.set_item(SESSION_KEY, &raw).await?;
        self.session = Some(session.clone());
        Ok(())
    }
}
