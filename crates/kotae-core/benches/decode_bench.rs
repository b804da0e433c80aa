use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kotae_core::decode::{decode, DecodeConfig};
use kotae_core::encode::{FeatureBuilder, FeatureConfig};
use kotae_core::tokenize::{BasicTokenizer, SubwordTokenizer};
use kotae_core::types::{Example, RawResult, StandardResult};

/// Word-level stand-in for a real subword vocabulary.
struct WordTokenizer {
    basic: BasicTokenizer,
}

impl WordTokenizer {
    fn new() -> Self {
        Self {
            basic: BasicTokenizer::new(true),
        }
    }
}

impl SubwordTokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        self.basic.tokenize(text)
    }

    fn convert_tokens_to_ids(&self, tokens: &[String]) -> Vec<u32> {
        tokens
            .iter()
            .map(|t| {
                let mut hash: u32 = 0x811c_9dc5;
                for byte in t.as_bytes() {
                    hash ^= u32::from(*byte);
                    hash = hash.wrapping_mul(0x0100_0193);
                }
                hash | 1
            })
            .collect()
    }
}

fn fixture(num_examples: usize) -> (Vec<Example>, FeatureConfig) {
    let doc: Vec<String> = "The committee published its final report in March 1995 , \
        naming John Smith as the principal author of the findings ."
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let examples = (0..num_examples)
        .map(|i| Example::new(format!("q{i}"), "Who wrote the report?", doc.clone()))
        .collect();
    let config = FeatureConfig::new().with_max_seq_length(64).with_doc_stride(16);
    (examples, config)
}

fn synthetic_results(features: &[kotae_core::types::Feature]) -> Vec<RawResult> {
    features
        .iter()
        .map(|f| {
            let mut start_logits = vec![0.0f32; f.input_ids.len()];
            let mut end_logits = vec![0.0f32; f.input_ids.len()];
            for pos in 0..f.paragraph_len {
                let doc_pos = pos + f.tokens.len() - f.paragraph_len - 1;
                start_logits[doc_pos] = (pos % 7) as f32;
                end_logits[doc_pos] = ((pos + 3) % 7) as f32;
            }
            RawResult::Standard(StandardResult {
                unique_id: f.unique_id,
                start_logits,
                end_logits,
            })
        })
        .collect()
}

fn bench_feature_build(c: &mut Criterion) {
    let tokenizer = WordTokenizer::new();
    let (examples, config) = fixture(64);
    let builder = FeatureBuilder::new(&tokenizer, config);

    c.bench_function("feature_build_64_examples", |b| {
        b.iter(|| builder.build(black_box(&examples)).unwrap());
    });
}

fn bench_decode(c: &mut Criterion) {
    let tokenizer = WordTokenizer::new();
    let (examples, config) = fixture(64);
    let features = FeatureBuilder::new(&tokenizer, config).build(&examples).unwrap();
    let results = synthetic_results(&features);
    let decode_config = DecodeConfig::new();

    c.bench_function("decode_standard_64_examples", |b| {
        b.iter(|| {
            decode(
                black_box(&examples),
                black_box(&features),
                black_box(&results),
                &decode_config,
            )
            .unwrap()
        });
    });
}

criterion_group!(benches, bench_feature_build, bench_decode);
criterion_main!(benches);
