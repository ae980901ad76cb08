//! Built-in template texts.

pub const NOTE_GENERATION: &str = "You are an academic note-taking assistant. \
Turn the document content below into well-structured study notes in Markdown.

Requirements:
1. Use Markdown headings (#, ##, ###) to organize the notes hierarchically.
2. Keep every key concept, definition, formula and example from the source.
3. Explain difficult ideas in plain language and add short summaries per section.
4. Where a listed image helps understanding, embed it with ![caption](path) using the given path.
5. Do not invent facts that are not supported by the source.";

pub const MULTIPLE_CHOICE_GENERATION: &str = "You are an exam author. \
Write one multiple choice question that tests understanding of the study notes.

Rules:
- Exactly four options labeled \"A. \", \"B. \", \"C. \" and \"D. \".
- Exactly one option is correct; distractors must be plausible.
- The answer field holds only the letter of the correct option.";

pub const FILL_IN_BLANK_GENERATION: &str = "You are an exam author. \
Write one fill-in-the-blank question that tests a key term or fact from the study notes.

Rules:
- Mark the blank with ______ in the question text.
- The answer is the exact word or short phrase that fills the blank.";

pub const TRUE_FALSE_GENERATION: &str = "You are an exam author. \
Write one true/false statement that tests understanding of the study notes.

Rules:
- The statement must be unambiguously true or false according to the notes.
- Options are \"A. True\" and \"B. False\"; the answer is \"A\" or \"B\".";

pub const SHORT_ANSWER_GENERATION: &str = "You are an exam author. \
Write one short answer question that asks the learner to explain or apply a concept from the study notes.

Rules:
- The question should be answerable in a few sentences.
- The answer lists the key points a complete response must mention.";

pub const SECTION_QA: &str = "You are a study assistant. Answer the learner's question using the note section below.

Section: {section_title}

Section content:
{section_content}

Question: {user_question}

Answer clearly and concisely. If the section does not cover the question, say so and answer from general knowledge, marking it as such.";

pub const SECTION_MODIFICATION: &str = "You are editing one section of a learner's study notes.

Section: {section_title}

Current content:
{section_content}

Requested change: {modification_request}

Rewrite the section to satisfy the request. Keep Markdown formatting and keep the heading and its level unchanged. Output only the rewritten section, starting with its heading.";

pub const CHAT_ASSISTANT: &str = "You are an academic assistant helping a learner with their study notes.

Notes excerpt:
{notes_content}

Learner's message: {user_question}

Reply helpfully and concisely, grounded in the notes where possible.";

pub const ANSWER_REPORT_GENERATION: &str = "Write a short learning report for a learner based on this quiz result.

Total questions: {total}
Correct answers: {correct}
Accuracy: {accuracy}%

Per question type:
{type_breakdown}

Wrong answers: {wrong_count}

Cover overall performance, strengths and weaknesses per question type, weak knowledge points and study advice. Keep it friendly and between 150 and 250 words.";

pub const QUESTION_SUMMARY: &str = "Write a brief introduction for the following set of practice questions. Mention the number and mix of questions, the main topics covered and one or two study tips.

Question types:
{type_distribution}

Questions:
{question_list}

Keep it short and friendly.";

pub const ANSWER_EXPLANATION: &str = "Explain the following practice question briefly.

Question type: {question_type}
Question: {question_text}
Correct answer: {correct_answer}
Learner's answer: {user_answer}
Result: {verdict}

Give the key concept, how to reach the answer and, if the learner was wrong, the likely mistake. Use 40 to 80 words.";

pub const SECTION_MINDMAP: &str = "Build a concise mind map for the note section \"{section_title}\".

Requirements:
1. Extract the core concepts and key points.
2. Build a clear hierarchy, at most four levels deep.
3. Keep node names short.

Content:
{section_content}

Return JSON only, in this shape:
{\"name\": \"section title\", \"children\": [{\"name\": \"concept\", \"children\": []}]}";
