//! Criterion benchmark for the temporal associator hot path.

use criterion::{criterion_group, criterion_main, Criterion};
use frise::{associate, PipelineConfig};
use frise_core::{DateMention, DocumentId, EventMention, EventType, PartialDate, Span};
use std::hint::black_box;

fn synthetic_document(events: usize, dates: usize) -> (Vec<EventMention>, Vec<DateMention>, String) {
    let doc = DocumentId::new("bench");
    let text = "Le patient a été revu en consultation. ".repeat(64);
    let text_len = text.chars().count();

    let event_mentions: Vec<EventMention> = (0..events)
        .map(|i| {
            let start = (i * 97) % (text_len - 24);
            EventMention {
                document_id: doc.clone(),
                span: Span::new(start, start + 10),
                event_type: EventType::ALL[i % 4],
                raw_text: "mention".to_string(),
                model_confidence: 0.8,
            }
        })
        .collect();
    let date_mentions: Vec<DateMention> = (0..dates)
        .map(|i| {
            let start = (i * 131 + 17) % (text_len - 24);
            DateMention {
                document_id: doc.clone(),
                span: Span::new(start, start + 10),
                raw_text: "12/01/2023".to_string(),
                resolved: PartialDate::from_ymd(2023, 1, 12),
                relative_offset: None,
                parse_confidence: 1.0,
            }
        })
        .collect();
    (event_mentions, date_mentions, text)
}

fn bench_associate(c: &mut Criterion) {
    let config = PipelineConfig::default();

    let mut group = c.benchmark_group("associate");
    for (events, dates) in [(5, 5), (20, 20), (50, 100)] {
        let (event_mentions, date_mentions, text) = synthetic_document(events, dates);
        group.bench_function(format!("{events}x{dates}"), |b| {
            b.iter(|| {
                black_box(associate(
                    black_box(&event_mentions),
                    black_box(&date_mentions),
                    black_box(&text),
                    black_box(&config),
                ))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_associate);
criterion_main!(benches);
