use client::{IngestReceipt, ReadifyApi, UploadFile};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ChatError;
use crate::message::ChatMessage;

pub const SESSION_ID_LEN: usize = 13;

const SESSION_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Random lowercase base-36 token. Only scopes server-side state, so it is
/// not meant to be unguessable.
pub fn new_session_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SESSION_ID_LEN)
        .map(|_| SESSION_ALPHABET[rng.gen_range(0..SESSION_ALPHABET.len())] as char)
        .collect()
}

/// One conversation with the document-chat backend.
///
/// Questions take `&mut self`, so a second one cannot be sent while the
/// first is still waiting for its answer.
pub struct ChatSession<A: ReadifyApi> {
    api: Arc<A>,
    session_id: String,
    files: Vec<String>,
    messages: Vec<ChatMessage>,
}

impl<A: ReadifyApi> ChatSession<A> {
    pub fn new(api: A) -> Self {
        Self::with_shared(Arc::new(api))
    }

    pub fn with_shared(api: Arc<A>) -> Self {
        let session_id = new_session_id();
        debug!(session_id = %session_id, "Starting chat session");
        Self {
            api,
            session_id,
            files: Vec::new(),
            messages: vec![ChatMessage::greeting()],
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Upload documents into this session. Accepted names are merged into
    /// the active file list; per-file rejections come back in the receipt.
    pub async fn upload(&mut self, files: &[UploadFile]) -> Result<IngestReceipt, ChatError> {
        if files.is_empty() {
            return Err(ChatError::NothingToUpload);
        }

        let receipt = self
            .api
            .upload(files, &self.session_id)
            .await
            .map_err(ChatError::Upload)?;

        for name in &receipt.filenames {
            if !self.files.contains(name) {
                self.files.push(name.clone());
            }
        }

        if !receipt.errors.is_empty() {
            warn!(
                session_id = %self.session_id,
                rejected = receipt.errors.len(),
                "Some files were not ingested"
            );
        }
        info!(
            session_id = %self.session_id,
            files = receipt.filenames.len(),
            chunks = receipt.chunks_processed,
            "Documents ingested"
        );

        Ok(receipt)
    }

    /// Ask a question about the active files and return the reply appended
    /// to the transcript. Blank questions are ignored.
    ///
    /// A failed query is not an error here: it becomes an assistant message
    /// carrying the backend's explanation.
    pub async fn ask(&mut self, question: &str) -> Option<&ChatMessage> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }

        self.messages.push(ChatMessage::user(question));

        let reply = match self
            .api
            .query(question, &self.files, &self.session_id)
            .await
        {
            Ok(answer) => {
                debug!(
                    session_id = %self.session_id,
                    citations = answer.citations.len(),
                    "Answer received"
                );
                ChatMessage::assistant(answer.answer, answer.citations)
            }
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Query failed");
                ChatMessage::query_failure(&e.detail())
            }
        };

        self.messages.push(reply);
        self.messages.last()
    }

    /// Drop a file from the active list. The backend copy is deleted on a
    /// best-effort basis.
    pub async fn remove_file(&mut self, name: &str) {
        self.files.retain(|f| f != name);

        if let Err(e) = self.api.delete_file(name, &self.session_id).await {
            warn!(
                session_id = %self.session_id,
                file = name,
                error = %e,
                "Backend delete failed, file removed locally only"
            );
        }
    }

    /// Clear the server-side session, then start over with a fresh id and
    /// only the greeting. On failure the current session is left untouched.
    pub async fn reset(&mut self) -> Result<(), ChatError> {
        self.api
            .reset(&self.session_id)
            .await
            .map_err(ChatError::Reset)?;

        let previous = std::mem::replace(&mut self.session_id, new_session_id());
        self.files.clear();
        self.messages = vec![ChatMessage::greeting()];
        info!(previous = %previous, session_id = %self.session_id, "Chat session reset");

        Ok(())
    }
}
