//! Answer resolution: FAQ short-circuit, grounded generation, apology
//! fallback.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use hr_voice_assistant::corpus::{FaqCorpus, FaqEntry, KnowledgeChunk, KnowledgeCorpus, KnowledgeRetriever};
use hr_voice_assistant::error::{AssistantError, Result, ServiceKind};
use hr_voice_assistant::gateway::{CompletionGateway, RetryPolicy};
use hr_voice_assistant::matcher::FaqMatcher;
use hr_voice_assistant::resolver::AnswerResolver;
use hr_voice_assistant::session::{AnswerSource, RollingHistory};

struct ScriptedCompletion {
    calls: AtomicUsize,
    /// Calls that fail before one succeeds; usize::MAX fails forever
    failures: usize,
    answer: String,
}

impl ScriptedCompletion {
    fn succeeding(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failures: 0,
            answer: answer.to_string(),
        })
    }

    fn flaky(failures: usize, answer: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failures,
            answer: answer.to_string(),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionGateway for ScriptedCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(AssistantError::service(
                ServiceKind::Completion,
                "scripted failure",
            ));
        }
        Ok(self.answer.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn faq() -> FaqCorpus {
    FaqCorpus::from_entries(vec![FaqEntry {
        id: 1,
        questions: vec!["Ինչպե՞ս վերցնել արձակուրդ".to_string()],
        answer: "Դիմեք HR պորտալին արձակուրդի համար։".to_string(),
    }])
    .unwrap()
}

fn knowledge() -> KnowledgeCorpus {
    KnowledgeCorpus::from_chunks(vec![KnowledgeChunk {
        item_id: "k1".to_string(),
        source_type: "doc".to_string(),
        source: "handbook".to_string(),
        text: "Աշխատավարձը վճարվում է ամսվա հինգին։".to_string(),
        meta: serde_json::Map::new(),
    }])
}

fn resolver(completion: Arc<dyn CompletionGateway>, max_attempts: u32) -> AnswerResolver {
    AnswerResolver::new(
        FaqMatcher::new(0.72),
        KnowledgeRetriever::new(),
        completion,
        RetryPolicy {
            max_attempts,
            backoff: std::time::Duration::from_millis(1),
        },
        RollingHistory::new(20),
        5,
    )
}

#[tokio::test]
async fn faq_match_skips_generation_entirely() {
    let completion = ScriptedCompletion::succeeding("never used");
    let resolver = resolver(completion.clone(), 3);

    let resolution = resolver
        .resolve("Ինչպե՞ս վերցնել արձակուրդ", &faq(), &knowledge(), &[])
        .await
        .unwrap();

    assert_eq!(resolution.source, AnswerSource::Faq);
    assert_eq!(resolution.faq_id, Some(1));
    assert!(resolution.match_score.unwrap() >= 0.72);
    assert!(!resolution.fallback);
    assert_eq!(completion.call_count(), 0);
}

#[tokio::test]
async fn below_threshold_question_is_generated() {
    let completion = ScriptedCompletion::succeeding("Աշխատավարձը վճարվում է ամսվա հինգին։");
    let resolver = resolver(completion.clone(), 3);

    let resolution = resolver
        .resolve("Ե՞րբ է վճարվում աշխատավարձը", &faq(), &knowledge(), &[])
        .await
        .unwrap();

    assert_eq!(resolution.source, AnswerSource::Generated);
    assert_eq!(resolution.faq_id, None);
    assert!(!resolution.fallback);
    assert_eq!(resolution.answer_text, "Աշխատավարձը վճարվում է ամսվա հինգին։");
    assert_eq!(completion.call_count(), 1);
}

#[tokio::test]
async fn transient_failure_is_retried_then_succeeds() {
    let completion = ScriptedCompletion::flaky(2, "Պատասխան երրորդ փորձից։");
    let resolver = resolver(completion.clone(), 3);

    let resolution = resolver
        .resolve("Ե՞րբ է վճարվում աշխատավարձը", &faq(), &knowledge(), &[])
        .await
        .unwrap();

    assert!(!resolution.fallback);
    assert_eq!(resolution.answer_text, "Պատասխան երրորդ փորձից։");
    assert_eq!(completion.call_count(), 3);
}

#[tokio::test]
async fn exhausted_retries_degrade_to_apology() {
    let completion = ScriptedCompletion::flaky(usize::MAX, "unreachable");
    let resolver = resolver(completion.clone(), 3);

    let resolution = resolver
        .resolve("Ե՞րբ է վճարվում աշխատավարձը", &faq(), &knowledge(), &[])
        .await
        .unwrap();

    assert!(resolution.fallback);
    assert_eq!(resolution.source, AnswerSource::Generated);
    assert!(resolution.answer_text.contains("Ներողություն"));
    assert_eq!(completion.call_count(), 3);
}

#[tokio::test]
async fn non_armenian_generation_is_replaced() {
    let completion = ScriptedCompletion::succeeding("Sorry, I can only answer in English.");
    let resolver = resolver(completion.clone(), 3);

    let resolution = resolver
        .resolve("Ե՞րբ է վճարվում աշխատավարձը", &faq(), &knowledge(), &[])
        .await
        .unwrap();

    assert!(!resolution.fallback);
    assert!(resolution.answer_text.contains("հայերեն"));
}
