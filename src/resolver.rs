//! Answer resolution: FAQ match first, retrieval-grounded generation
//! otherwise, canned apology when the completion service stays down.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::corpus::{format_context, FaqCorpus, KnowledgeCorpus, KnowledgeRetriever};
use crate::error::Result;
use crate::gateway::{with_retries, CompletionGateway, RetryPolicy};
use crate::matcher::FaqMatcher;
use crate::session::{RollingHistory, Turn};

/// Spoken when the completion service fails past the retry budget.
const APOLOGY_TEXT: &str =
    "Ներողություն, այս պահին չեմ կարողանում պատասխանել։ Խնդրում եմ կրկնել հարցը մի փոքր ուշ։";

/// Spoken when the generated answer itself fails the Armenian check.
const SPEAK_ARMENIAN_TEXT: &str = "Խնդրում եմ խոսել հայերեն։";

const PERSONA_PREAMBLE: &str = "\
Դու «Անահիտ»-ն ես՝ ընկերության HR բաժնի ձայնային օգնականը։ \
Պատասխանիր միայն հայերեն, կարճ և քաղաքավարի։ \
Պատասխանիր միայն ստորև բերված գիտելիքի հիման վրա. եթե հարցը դրանից դուրս է, \
ասա, որ չգիտես և առաջարկիր դիմել HR բաժին։";

/// What the resolver decided for one turn.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub answer_text: String,
    pub source: crate::session::AnswerSource,
    pub faq_id: Option<u32>,
    pub match_score: Option<f32>,
    /// True when the answer is the canned apology
    pub fallback: bool,
}

pub struct AnswerResolver {
    matcher: FaqMatcher,
    retriever: KnowledgeRetriever,
    completion: Arc<dyn CompletionGateway>,
    retry: RetryPolicy,
    history: RollingHistory,
    top_k: usize,
}

impl AnswerResolver {
    pub fn new(
        matcher: FaqMatcher,
        retriever: KnowledgeRetriever,
        completion: Arc<dyn CompletionGateway>,
        retry: RetryPolicy,
        history: RollingHistory,
        top_k: usize,
    ) -> Self {
        Self {
            matcher,
            retriever,
            completion,
            retry,
            history,
            top_k,
        }
    }

    /// Resolve an answer for the transcript. A confident FAQ match short-
    /// circuits generation entirely; otherwise the knowledge corpus and the
    /// rolling history feed one completion call (with retries). Exhausted
    /// retries degrade to the apology answer; this method only fails on
    /// non-service errors.
    pub async fn resolve(
        &self,
        transcript_text: &str,
        faq: &FaqCorpus,
        knowledge: &KnowledgeCorpus,
        prior_turns: &[Turn],
    ) -> Result<Resolution> {
        if let Some(found) = self.matcher.find_match(transcript_text, faq) {
            info!(
                faq_id = found.entry.id,
                score = found.score,
                question = %found.matched_question,
                "confident FAQ match"
            );
            return Ok(Resolution {
                answer_text: found.entry.answer.clone(),
                source: crate::session::AnswerSource::Faq,
                faq_id: Some(found.entry.id),
                match_score: Some(found.score),
                fallback: false,
            });
        }

        let chunks = self.retriever.retrieve(transcript_text, knowledge, self.top_k);
        debug!(chunks = chunks.len(), "knowledge retrieved for generation");
        let prompt = self.build_prompt(transcript_text, &chunks, prior_turns);

        let generated = with_retries(&self.retry, "completion", || {
            let prompt = prompt.clone();
            let completion = Arc::clone(&self.completion);
            async move { completion.complete(&prompt).await }
        })
        .await;

        match generated {
            Ok(text) => {
                let answer_text = if crate::text::is_mostly_armenian(&text, 0.3, 2) {
                    text
                } else {
                    warn!("generated answer failed the Armenian check, substituting fixed reply");
                    SPEAK_ARMENIAN_TEXT.to_string()
                };
                Ok(Resolution {
                    answer_text,
                    source: crate::session::AnswerSource::Generated,
                    faq_id: None,
                    match_score: None,
                    fallback: false,
                })
            }
            Err(err) if err.is_retryable() => {
                warn!(error = %err, "completion retries exhausted, answering with apology");
                Ok(Resolution {
                    answer_text: APOLOGY_TEXT.to_string(),
                    source: crate::session::AnswerSource::Generated,
                    faq_id: None,
                    match_score: None,
                    fallback: true,
                })
            }
            Err(err) => Err(err),
        }
    }

    fn build_prompt(
        &self,
        transcript_text: &str,
        chunks: &[crate::corpus::KnowledgeChunk],
        prior_turns: &[Turn],
    ) -> String {
        format!(
            "{PERSONA_PREAMBLE}\n\n\
             ### Գիտելիք\n{}\n\n\
             ### Նախորդ խոսակցություն\n{}\n\n\
             ### Հարց\n{}\n\n\
             Պատասխանիր հայերեն, առավելագույնը 3 նախադասությամբ։",
            format_context(chunks),
            self.history.prompt_block(prior_turns),
            transcript_text.trim()
        )
    }
}
