//! Local keyword-matching responder

use super::{Responder, ResponderError};
use async_trait::async_trait;

pub const GREETING_REPLY: &str =
    "Hello! I'm your nutrition assistant. How can I help you today?";

pub const PROTEIN_REPLY: &str = "Good sources of protein include lean meats, fish, eggs, dairy, legumes, nuts, and seeds. Plant-based options like tofu, tempeh, and seitan are excellent for vegetarians and vegans. For optimal health, aim to include a variety of protein sources in your diet.";

pub const WEIGHT_LOSS_REPLY: &str = "Sustainable weight loss typically involves a balanced diet with a moderate calorie deficit, regular physical activity, adequate sleep, and stress management. Focus on whole foods, plenty of vegetables, lean proteins, and staying hydrated. Remember that healthy weight loss is usually gradual, around 1-2 pounds per week.";

pub const MICRONUTRIENT_REPLY: &str = "Vitamins and minerals are essential micronutrients. A varied diet with plenty of fruits, vegetables, whole grains, and proteins usually provides adequate amounts. Specific deficiencies may require targeted foods or supplements. If you're concerned about a specific vitamin or mineral, please ask and I can provide more detailed information.";

pub const MEAL_PLAN_REPLY: &str = "A balanced meal plan typically includes a variety of foods from all food groups: fruits, vegetables, whole grains, lean proteins, and healthy fats. Portion control is also important. Would you like me to suggest a sample meal plan based on specific dietary preferences or goals?";

const GENERIC_PREFIX: &str = "Thank you for your question about ";
const GENERIC_SUFFIX: &str = ". To provide you with the most accurate nutrition advice, I'd need a bit more information. Could you please elaborate on your specific concerns or goals? I'm here to help with personalized nutrition guidance.";

/// Greetings match whole words, unlike the topic phrases. Plain substring
/// matching would read "which" or "high" as "hi" and greet instead of answering.
const GREETING_WORDS: &[&str] = &["hello", "hi", "hey"];

/// Checked in order after greetings; the first rule with any matching phrase wins
const TOPIC_RULES: &[(&[&str], &str)] = &[
    (&["protein", "proteins"], PROTEIN_REPLY),
    (&["weight loss", "lose weight"], WEIGHT_LOSS_REPLY),
    (&["vitamin", "mineral"], MICRONUTRIENT_REPLY),
    (&["meal plan", "diet plan"], MEAL_PLAN_REPLY),
];

/// Deterministic stand-in for a real nutrition backend
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordResponder;

impl KeywordResponder {
    pub fn new() -> Self {
        Self
    }

    /// Pick the reply for `input`; never fails
    pub fn reply_for(input: &str) -> String {
        let lowered = input.to_lowercase();

        if contains_greeting(&lowered) {
            return GREETING_REPLY.to_string();
        }

        TOPIC_RULES
            .iter()
            .find(|(phrases, _)| phrases.iter().any(|p| lowered.contains(p)))
            .map_or_else(
                || format!("{GENERIC_PREFIX}{input}{GENERIC_SUFFIX}"),
                |(_, reply)| (*reply).to_string(),
            )
    }
}

fn contains_greeting(lowered: &str) -> bool {
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| GREETING_WORDS.contains(&word))
}

#[async_trait]
impl Responder for KeywordResponder {
    async fn produce_reply(&self, text: &str) -> Result<String, ResponderError> {
        Ok(Self::reply_for(text))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
