//! Tutor prompts: free questions and "explain my mistake" requests.

use crate::config::Prompts;
use crate::domain::{AnswerValue, Lang};
use crate::openai::{ChatMessage, ChatRole};
use crate::util::fill_template;

pub fn dont_know_phrase(lang: Lang) -> &'static str {
  lang.pick(
    "I couldn\u{2019}t find an exact answer in the provided material.",
    "Berilgan material asosida aniq javob topilmadi.",
  )
}

/// System prompt plus one user turn carrying the context block and the question.
pub fn build_messages(prompts: &Prompts, lang: Lang, question: &str, context: &str) -> Vec<ChatMessage> {
  let system = match lang {
    Lang::En => &prompts.tutor_system_en,
    Lang::Uz => &prompts.tutor_system_uz,
  };
  let context = if context.trim().is_empty() { "(empty)" } else { context };
  let user = fill_template(&prompts.tutor_user_template, &[("context", context), ("question", question)]);
  vec![ChatMessage::new(ChatRole::System, system.as_str()), ChatMessage::new(ChatRole::User, user)]
}

pub struct MistakeReport<'a> {
  pub prompt: &'a str,
  pub correct_answer: &'a AnswerValue,
  pub user_answer: &'a AnswerValue,
  pub context: &'a str,
  pub article_slug: Option<&'a str>,
  pub section: Option<&'a str>,
}

/// The question and merged context for an explanation of a wrong answer.
pub fn explain_task(lang: Lang, report: &MistakeReport<'_>) -> (String, String) {
  let lines: [String; 6] = match lang {
    Lang::En => [
      format!("Question: {}", report.prompt),
      format!("Correct answer: {}", report.correct_answer),
      format!("User answered: {}", report.user_answer),
      "Explain why the correct answer is correct and the user answer is wrong.".into(),
      "Use the provided context only.".into(),
      "Add one short tip at the end.".into(),
    ],
    Lang::Uz => [
      format!("Savol: {}", report.prompt),
      format!("Togri javob: {}", report.correct_answer),
      format!("Foydalanuvchi javobi: {}", report.user_answer),
      "Nima uchun togri javob togri, foydalanuvchi javobi esa notogri ekanini tushuntir.".into(),
      "Faqat kontekstga tayangan holda tushuntir.".into(),
      "Oxirida qisqa bitta tip qo`sh.".into(),
    ],
  };

  let source: Vec<&str> = [report.article_slug, report.section]
    .into_iter()
    .flatten()
    .filter(|s| !s.is_empty())
    .collect();
  let source = if source.is_empty() { "unknown source".to_string() } else { source.join(" -> ") };
  let context = if report.context.trim().is_empty() { "No extra context provided." } else { report.context };

  (lines.join("\n"), format!("SOURCE: {}\n\n{}", source, context))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn messages_carry_context_and_question() {
    let prompts = Prompts::default();
    let msgs = build_messages(&prompts, Lang::En, "What is wu wei?", "");
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0].role, ChatRole::System);
    assert!(msgs[0].content.starts_with("You are Dualium Tutor."));
    assert_eq!(msgs[1].content, "CONTEXT:\n(empty)\n\nQUESTION:\nWhat is wu wei?");

    let uz = build_messages(&prompts, Lang::Uz, "Dao nima?", "Daochilik");
    assert!(uz[0].content.starts_with("Sen Dualium tutorisan."));
    assert!(uz[1].content.contains("CONTEXT:\nDaochilik\n"));
  }

  #[test]
  fn explain_task_merges_source() {
    let correct = AnswerValue::Bool(false);
    let user = AnswerValue::from("true");
    let report = MistakeReport {
      prompt: "Wu wei means force?",
      correct_answer: &correct,
      user_answer: &user,
      context: "",
      article_slug: Some("daoism-natural-harmony"),
      section: Some("Principle of wu wei"),
    };
    let (task, context) = explain_task(Lang::En, &report);
    assert!(task.contains("Correct answer: false"));
    assert!(task.contains("User answered: true"));
    assert_eq!(
      context,
      "SOURCE: daoism-natural-harmony -> Principle of wu wei\n\nNo extra context provided."
    );

    let bare = MistakeReport { article_slug: None, section: None, ..report };
    assert!(explain_task(Lang::Uz, &bare).1.starts_with("SOURCE: unknown source"));
  }

  #[test]
  fn dont_know_is_localized() {
    assert!(dont_know_phrase(Lang::Uz).starts_with("Berilgan"));
    assert!(dont_know_phrase(Lang::En).starts_with("I couldn"));
  }
}
