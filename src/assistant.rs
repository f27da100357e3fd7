//! The conversation session loop
//!
//! Orchestrates capture, endpoint detection, transcription, retrieval, and
//! reply generation. The loop is the sole driver of the detector: frames are
//! drained from the capture channel in order and fed to it synchronously.
//! A failed turn is reported and the session re-enters listening; a single
//! bad frame never crashes the loop.

use std::time::Duration;

use crate::audio::{EndpointDetector, EnergyClassifier, FrameCapture, UtteranceSegment};
use crate::chat::ChatClient;
use crate::config::Config;
use crate::knowledge::{EmbeddingClient, KnowledgeBase, format_context};
use crate::stt::SpeechToText;
use crate::{Error, Result};

/// How often the loop drains pending frames from the capture channel
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Width of the word-wrapped printed reply
const REPLY_WIDTH: usize = 70;

/// Voice-driven conversational assistant session
pub struct Assistant {
    config: Config,
    stt: SpeechToText,
    chat: ChatClient,
    embedder: Option<EmbeddingClient>,
    knowledge: Option<KnowledgeBase>,
}

impl Assistant {
    /// Build an assistant from configuration.
    ///
    /// The knowledge base is optional: a missing documents folder logs a
    /// notice and the assistant runs without retrieval context.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or a client cannot be built.
    pub async fn new(config: Config) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or_else(|| Error::InvalidConfig("OPENAI_API_KEY not set".to_string()))?;

        let stt = SpeechToText::new(
            api_key.clone(),
            config.stt.model.clone(),
            config.stt.language.clone(),
            config.audio.sample_rate,
        )?;

        let chat = ChatClient::new(
            api_key.clone(),
            config.chat.model.clone(),
            config.chat.max_tokens,
            config.chat.temperature,
        )?;

        let (embedder, knowledge) = if config.knowledge.documents_dir.exists() {
            let embedder =
                EmbeddingClient::new(api_key, config.knowledge.embedding_model.clone())?;

            tracing::info!(
                dir = %config.knowledge.documents_dir.display(),
                "loading knowledge base"
            );
            match KnowledgeBase::load(
                &config.knowledge.documents_dir,
                &embedder,
                &config.embedding_cache_path(),
                config.knowledge.chunk_size,
                config.knowledge.chunk_overlap,
            )
            .await
            {
                Ok(kb) => {
                    tracing::info!(
                        documents = kb.document_count(),
                        chunks = kb.chunk_count(),
                        "knowledge base ready"
                    );
                    (Some(embedder), Some(kb))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to load knowledge base, continuing without");
                    (None, None)
                }
            }
        } else {
            tracing::info!(
                dir = %config.knowledge.documents_dir.display(),
                "documents folder not found, continuing without knowledge"
            );
            (None, None)
        };

        Ok(Self {
            config,
            stt,
            chat,
            embedder,
            knowledge,
        })
    }

    /// Run the listening loop until Ctrl-C.
    ///
    /// Must be called from the thread that owns the capture for its lifetime
    /// (`cpal` streams are not `Send`).
    ///
    /// # Errors
    ///
    /// Returns error if the capture device or detector cannot be set up;
    /// per-turn failures are logged and the loop continues.
    pub async fn run(&self) -> Result<()> {
        let classifier = EnergyClassifier::new(self.config.audio.energy_threshold);
        let mut detector = EndpointDetector::new(self.config.audio.detector_config(), classifier)?;

        let mut capture = FrameCapture::new(
            self.config.audio.sample_rate,
            self.config.audio.frame_duration_ms,
        )?;
        let frames = capture.start()?;

        println!("Listening... (speak now, Ctrl-C to exit)");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                () = tokio::time::sleep(POLL_INTERVAL) => {
                    // Frames arrive in temporal order; drain everything
                    // pending before sleeping again
                    while let Ok(frame) = frames.try_recv() {
                        match detector.process_frame(frame) {
                            Ok(Some(segment)) => {
                                println!("Processing speech...");
                                if let Err(e) = self.handle_utterance(&segment).await {
                                    tracing::error!(error = %e, "turn failed");
                                    println!("Sorry, something went wrong. Still listening.");
                                }
                                println!("Listening...");
                            }
                            Ok(None) => {}
                            Err(e) => {
                                // Malformed frame: skip it, state is untouched
                                tracing::warn!(error = %e, "dropped frame");
                            }
                        }
                    }
                }
            }
        }

        capture.stop();
        Ok(())
    }

    /// One conversational turn: transcribe, retrieve, reply, print
    async fn handle_utterance(&self, segment: &UtteranceSegment) -> Result<()> {
        let Some(text) = self.stt.transcribe(segment).await? else {
            println!("Could not understand. Please try again.");
            return Ok(());
        };

        println!("You: {text}");

        let context = self.retrieve_context(&text).await;
        let reply = self
            .chat
            .reply(&self.config.chat.system_prompt, &text, context.as_deref())
            .await?;

        println!("\n{}\n", textwrap::fill(&reply, REPLY_WIDTH));
        Ok(())
    }

    /// Retrieve formatted reference context for the user's utterance.
    ///
    /// Retrieval failures degrade to no context rather than failing the turn.
    async fn retrieve_context(&self, text: &str) -> Option<String> {
        let (embedder, kb) = self.embedder.as_ref().zip(self.knowledge.as_ref())?;

        match embedder.embed_one(text).await {
            Ok(query) => {
                let results = kb.search(
                    &query,
                    self.config.knowledge.top_k,
                    self.config.knowledge.min_similarity,
                );
                if results.is_empty() {
                    tracing::debug!("no relevant knowledge for utterance");
                    return None;
                }
                tracing::debug!(matches = results.len(), "retrieved context");
                Some(format_context(
                    &results,
                    self.config.knowledge.max_context_chars,
                ))
            }
            Err(e) => {
                tracing::warn!(error = %e, "context retrieval failed, replying without");
                None
            }
        }
    }
}
