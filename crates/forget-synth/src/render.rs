//! Task renderers.
//!
//! Every renderer is a pure function of the mixed vector: the vector picks
//! word lengths and class logits directly, and the remaining choices come
//! from a `StdRng` seeded with the SHA-256 of the vector. All freshness
//! comes from the mixer.

use forget_core::{
    ClassificationParams, GenericOutputType, GenericParams, Sha256Accumulator, TaskSpec,
    TextGenerationParams, TextStyle, TextTone, Timestamp, TranslationParams,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::output::{ClassificationOutput, FeatureSummary, StructuredOutput, SynthesizedOutput};

const VOWELS: &[u8] = b"aeiou";
const CONSONANTS: &[u8] = b"bcdfghjklmnpqrstvwxyz";
const DRAMATIC: &[u8] = b"aeiouxyz";
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const TECHNICAL_TERMS: [&str; 5] = ["algorithm", "protocol", "framework", "system", "process"];

/// Words in generic text output.
pub const GENERIC_TEXT_WORDS: usize = 50;
/// Words in a meaning-preserving translation.
pub const TRANSLATION_WORDS: usize = 20;
/// Words in a free-form translation.
pub const FREE_TRANSLATION_WORDS: usize = 25;

fn seeded_rng(mixed: &[f64]) -> StdRng {
    let mut acc = Sha256Accumulator::new();
    acc.update_f64s(mixed);
    StdRng::from_seed(acc.finalize().bytes)
}

/// Value at `i` (cyclic) of the vector rescaled to `[0, 1]`.
fn unit_at(mixed: &[f64], i: usize) -> f64 {
    if mixed.is_empty() {
        return 0.5;
    }
    ((mixed[i % mixed.len()] + 1.0) / 2.0).clamp(0.0, 1.0)
}

fn word_from(alphabet: &[u8], len: usize, rng: &mut StdRng) -> String {
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

fn poetic_word(len: usize, rng: &mut StdRng) -> String {
    (0..len)
        .map(|i| {
            let alphabet = if i % 2 == 0 { CONSONANTS } else { VOWELS };
            alphabet[rng.gen_range(0..alphabet.len())] as char
        })
        .collect()
}

fn creative_text(mixed: &[f64], length: usize, tone: TextTone, rng: &mut StdRng) -> String {
    let mut tokens = Vec::with_capacity(length + length / 5);
    for i in 0..length {
        let word_len = 3 + (unit_at(mixed, i) * 5.0) as usize;
        tokens.push(match tone {
            TextTone::Poetic => poetic_word(word_len, rng),
            TextTone::Dramatic => word_from(DRAMATIC, word_len, rng),
            TextTone::Neutral => word_from(ALPHABET, word_len, rng),
        });
        if i > 0 && i % 7 == 0 {
            tokens.push(".".to_string());
        } else if i > 0 && i % 5 == 0 {
            tokens.push(",".to_string());
        }
    }
    tokens.join(" ")
}

fn technical_text(length: usize, rng: &mut StdRng) -> String {
    (0..length)
        .map(|i| {
            if i % 3 == 0 {
                TECHNICAL_TERMS[rng.gen_range(0..TECHNICAL_TERMS.len())].to_string()
            } else {
                word_from(ALPHABET, 5, rng)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn generic_text(length: usize, rng: &mut StdRng) -> String {
    (0..length)
        .map(|_| word_from(ALPHABET, 4, rng))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render text per style and tone.
pub fn text(mixed: &[f64], params: &TextGenerationParams) -> String {
    let mut rng = seeded_rng(mixed);
    match params.style {
        TextStyle::Creative => creative_text(mixed, params.target_length, params.tone, &mut rng),
        TextStyle::Technical => technical_text(params.target_length, &mut rng),
        TextStyle::Generic => generic_text(params.target_length, &mut rng),
    }
}

/// Softmax over the first `num_classes` entries.
pub fn classification(mixed: &[f64], params: &ClassificationParams) -> ClassificationOutput {
    let logits: Vec<f64> = (0..params.num_classes.max(1))
        .map(|i| mixed.get(i).copied().unwrap_or(0.0))
        .collect();
    let max_logit = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max_logit).exp()).collect();
    let z: f64 = exps.iter().sum();
    let probs: Vec<f64> = exps.iter().map(|e| e / z).collect();

    let (arg_max, confidence) = probs
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });
    let predicted_class = (confidence >= params.confidence_threshold).then_some(arg_max);
    ClassificationOutput {
        predicted_class,
        class_probabilities: probs,
        confidence,
        uncertain: predicted_class.is_none(),
    }
}

/// Render a translation tagged with its target language.
pub fn translation(mixed: &[f64], params: &TranslationParams) -> SynthesizedOutput {
    let mut rng = seeded_rng(mixed);
    let text = if params.preserve_meaning {
        generic_text(TRANSLATION_WORDS, &mut rng)
    } else {
        creative_text(mixed, FREE_TRANSLATION_WORDS, TextTone::Neutral, &mut rng)
    };
    SynthesizedOutput::Translation {
        text,
        target_language: params.target_language.clone(),
    }
}

fn structured(mixed: &[f64]) -> StructuredOutput {
    let n = mixed.len().max(1) as f64;
    let mean = mixed.iter().sum::<f64>() / n;
    let std = (mixed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    let min = mixed.iter().copied().fold(f64::INFINITY, f64::min);
    let max = mixed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    StructuredOutput {
        features: mixed.to_vec(),
        summary: FeatureSummary {
            mean,
            std,
            min: if mixed.is_empty() { 0.0 } else { min },
            max: if mixed.is_empty() { 0.0 } else { max },
        },
        dimensions: mixed.len(),
        generated_at: Timestamp::now(),
    }
}

/// Render the generic task.
pub fn generic(mixed: &[f64], params: &GenericParams) -> SynthesizedOutput {
    match params.output_type {
        GenericOutputType::Text => SynthesizedOutput::Text {
            text: generic_text(GENERIC_TEXT_WORDS, &mut seeded_rng(mixed)),
        },
        GenericOutputType::Numeric => SynthesizedOutput::Numeric {
            values: (0..mixed.len()).map(|i| unit_at(mixed, i)).collect(),
        },
        GenericOutputType::Structured => SynthesizedOutput::Structured(structured(mixed)),
    }
}

/// Dispatch on the task.
pub fn render(mixed: &[f64], task: &TaskSpec) -> SynthesizedOutput {
    match task {
        TaskSpec::TextGeneration(p) => SynthesizedOutput::Text { text: text(mixed, p) },
        TaskSpec::Classification(p) => SynthesizedOutput::Classification(classification(mixed, p)),
        TaskSpec::Translation(p) => translation(mixed, p),
        TaskSpec::Generic(p) => generic(mixed, p),
    }
}
