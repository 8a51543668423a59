use crate::ai::SummaryLength;

pub fn summarize_prompt(text: &str, length: SummaryLength) -> String {
    let instruction = match length {
        SummaryLength::Short => "a very short summary of 2-3 sentences",
        SummaryLength::Medium => "a medium-length summary in a single paragraph",
        SummaryLength::Long => "a detailed summary of 2-3 paragraphs",
    };

    format!(
        r#"Summarize the following text as {instruction}.

Rules:
- Keep the main topics and the important points
- Leave out unnecessary detail
- Write fluently and clearly, in the language of the text
- Keep an objective tone
- Preserve the main message of the original

Text to summarize:
"{text}"

Answer ONLY with JSON in the following format:

{{
  "originalLength": {original_length},
  "summary": "the summary (string)",
  "keyPoints": ["key point 1", "key point 2", "key point 3"],
  "summaryLength": "{length}"
}}

Output only the requested JSON and nothing else."#,
        instruction = instruction,
        text = text,
        original_length = text.chars().count(),
        length = length.as_str(),
    )
}

pub fn image_analysis_prompt(user_text: &str) -> String {
    format!(
        r#"Analyze this image and give a detailed description guided by the user's request.

User's request: "{user_text}"

Rules:
- Describe what you see in detail
- Focus on the user's request
- Identify colors, objects, people and activities
- Comment on the composition
- If there is text, read it and explain it
- Comment on image quality and technical properties

Answer ONLY with JSON in the following format:

{{
  "description": "general description (string)",
  "detailedAnalysis": "analysis focused on the user's request (string)",
  "objects": ["object 1", "object 2"],
  "colors": ["color 1", "color 2"],
  "textInImage": "text found in the image, or an empty string",
  "mood": "overall atmosphere (string)",
  "technicalNotes": "resolution, quality and similar notes (string)"
}}

Output only the requested JSON and nothing else."#,
        user_text = user_text
    )
}
