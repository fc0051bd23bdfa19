//! Prompt construction
//!
//! The instruction is a fixed Korean template: the model plays an ordinary
//! delivery-food customer and writes a short, upbeat review of the named dish.

use crate::types::{ContentPart, ImageDataUri, Prompt, PromptMessage};

/// Build the single-message review prompt: image first, then instructions
pub fn build(food_name: &str, image: ImageDataUri) -> Prompt {
    Prompt {
        messages: vec![PromptMessage {
            role: "user".to_string(),
            content: vec![
                ContentPart::Image { image },
                ContentPart::Text {
                    text: instruction(food_name),
                },
            ],
        }],
    }
}

/// The review instruction for `food_name`
pub fn instruction(food_name: &str) -> String {
    format!(
        "당신은 평범한 배달 음식 소비자입니다.\n\
         이 음식 이미지를 보고 {food_name}에 대해 알맞고 긍정적인 리뷰 멘트를 작성해주세요.\n\
         유쾌하거나 감동적인 톤으로 150자 이내로 써주세요."
    )
}
