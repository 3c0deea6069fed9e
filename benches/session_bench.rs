//! Session and request conversion performance benchmarks

use aichat::models::openai::*;
use aichat::services::ApiConverter;
use aichat::tools::{token_stats_tool, ToolRegistry};
use aichat::{CompletionBackend, ContentPart, ConversationSession, ImagePayload, Turn};
use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

/// Answers instantly with a fixed reply
struct InstantBackend;

#[async_trait]
impl CompletionBackend for InstantBackend {
    fn name(&self) -> &str {
        "instant"
    }

    async fn chat_complete(&self, request: OpenAIRequest) -> anyhow::Result<OpenAIResponse> {
        Ok(OpenAIResponse {
            id: "chatcmpl-bench".to_string(),
            object: "chat.completion".to_string(),
            created: 1_700_000_000,
            model: request.model,
            choices: vec![OpenAIChoice {
                index: 0,
                message: OpenAIMessage {
                    role: "assistant".to_string(),
                    content: Some(OpenAIContent::Text("Bonjour!".to_string())),
                    ..Default::default()
                },
                finish_reason: Some("stop".to_string()),
            }],
            usage: Some(OpenAIUsage {
                prompt_tokens: 120,
                completion_tokens: 8,
                total_tokens: 128,
            }),
            system_fingerprint: None,
        })
    }
}

fn transcript(pairs: usize) -> Vec<Turn> {
    let mut turns = vec![Turn::system("You are a helpful tutor on French culture.")];
    for i in 0..pairs {
        turns.push(Turn::user(format!("Question {} about French history?", i)));
        turns.push(Turn::assistant(format!("Answer {} about the Fifth Republic.", i)));
    }
    turns
}

fn bench_build_request(c: &mut Criterion) {
    let converter = ApiConverter::new();
    let (declaration, _) = token_stats_tool();
    let mut group = c.benchmark_group("build_request");

    for pairs in [1usize, 10, 50] {
        let turns = transcript(pairs);
        group.bench_with_input(BenchmarkId::new("text", pairs), &turns, |b, turns| {
            b.iter(|| {
                black_box(converter.build_request(
                    black_box("gpt-4o-mini"),
                    turns.iter(),
                    std::iter::once(&declaration),
                    None,
                ))
            })
        });
    }

    let image = ImagePayload::from_bytes("image/png", &[0u8; 4096]);
    let multimodal = vec![Turn::user_parts(vec![
        ContentPart::text("Extract the bill details."),
        ContentPart::image(image),
    ])];
    group.bench_function("multimodal", |b| {
        b.iter(|| {
            black_box(converter.build_request(
                "gpt-4o",
                multimodal.iter(),
                std::iter::empty(),
                None,
            ))
        })
    });

    group.finish();
}

fn bench_submit(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let backend: Arc<dyn CompletionBackend> = Arc::new(InstantBackend);
    c.bench_function("submit_stateless", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let (declaration, handler) = token_stats_tool();
                let tools = ToolRegistry::new().with_tool(declaration, handler).unwrap();
                let session = ConversationSession::builder(backend.clone(), "gpt-4o-mini")
                    .system_prompt("You are a helpful tutor on French culture.")
                    .policy("Only answer questions relevant to French culture and history.")
                    .tools(tools)
                    .build()
                    .unwrap();
                black_box(session.submit("Who was Charles de Gaulle?").await.unwrap())
            })
        })
    });

    let session = ConversationSession::builder(backend.clone(), "gpt-4o-mini")
        .system_prompt("You are a helpful tutor on French culture.")
        .build()
        .unwrap();
    c.bench_function("submit_growing_transcript", |b| {
        b.iter(|| runtime.block_on(async { black_box(session.submit("Tell me more.").await.unwrap()) }))
    });
}

criterion_group!(benches, bench_build_request, bench_submit);
criterion_main!(benches);
