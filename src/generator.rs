//! Quiz question generator.
//!
//! Builds a pool of drafts from the scoped content (definition, attribution and
//! comparison categories), then samples a quiz that follows the difficulty's
//! target mix of question types. All randomness comes from the caller's `Rng`,
//! so a seeded generator reproduces a quiz exactly.

use rand::Rng;
use tracing::{debug, instrument};
use uuid::Builder;

use crate::content::ContentIndex;
use crate::domain::{
  AnswerValue, Article, Difficulty, Lang, Philosopher, Question, QuestionType, QuizScope, QuizSetup, Region,
};
use crate::util::{shuffle, unique};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Category {
  Definition,
  Attribution,
  Comparison,
}

/// A question plus its sampling category. The category never leaves this module.
#[derive(Clone, Debug)]
struct QuestionDraft {
  category: Category,
  question: Question,
}

#[derive(Clone, Copy)]
enum Section {
  Summary,
  Takeaways,
  Ideas,
  Comparison,
}

impl Section {
  fn label(self, lang: Lang) -> &'static str {
    match self {
      Section::Summary => lang.pick("Summary", "Xulosa"),
      Section::Takeaways => lang.pick("Key Takeaways", "Asosiy Xulosalar"),
      Section::Ideas => lang.pick("Philosopher Key Ideas", "Faylasufning Asosiy Goyalari"),
      Section::Comparison => lang.pick("Comparative Lens", "Qiyosiy Tahlil"),
    }
  }
}

fn true_false_options(lang: Lang) -> Vec<String> {
  vec![lang.pick("True", "Togri").to_string(), lang.pick("False", "Notogri").to_string()]
}

fn source_explanation(lang: Lang, title: &str, section: &str, note: &str) -> String {
  format!("{}: {} -> {}. {}", lang.pick("Source", "Manba"), title, section, note)
}

fn create_id<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> String {
  let uuid = Builder::from_random_bytes(rng.gen()).into_uuid();
  format!("{}-{}", prefix, uuid)
}

/// Up to `count` distinct values from `options`, never `answer`, in random order.
fn pick_distractors<R: Rng + ?Sized>(options: &[String], answer: &str, count: usize, rng: &mut R) -> Vec<String> {
  let candidates = unique(options.iter().filter(|o| o.as_str() != answer).cloned());
  let mut picked = shuffle(&candidates, rng);
  picked.truncate(count);
  picked
}

struct ScopedData<'a> {
  articles: Vec<&'a Article>,
  philosophers: Vec<&'a Philosopher>,
}

/// An unknown article slug degrades to the full catalog, the same as `mixed`.
fn scope_data<'a>(index: &'a ContentIndex, scope: QuizScope, article_slug: Option<&str>) -> ScopedData<'a> {
  if scope == QuizScope::Article {
    if let Some(article) = article_slug.and_then(|slug| index.article(slug)) {
      let philosophers = index
        .philosophers()
        .iter()
        .filter(|p| p.related_articles.iter().any(|s| s == &article.slug))
        .collect();
      return ScopedData { articles: vec![article], philosophers };
    }
  }

  let region = match scope {
    QuizScope::East => Some(Region::East),
    QuizScope::West => Some(Region::West),
    QuizScope::Mixed | QuizScope::Article => None,
  };
  ScopedData { articles: index.articles_in(region), philosophers: index.philosophers_in(region) }
}

struct Draft<'s> {
  lang: Lang,
  title: &'s str,
  section: Section,
}

impl Draft<'_> {
  fn build(
    &self,
    id: String,
    category: Category,
    kind: QuestionType,
    prompt: String,
    options: Option<Vec<String>>,
    correct: AnswerValue,
    note: &str,
  ) -> QuestionDraft {
    let section = self.section.label(self.lang);
    QuestionDraft {
      category,
      question: Question {
        id,
        kind,
        prompt,
        options,
        correct_answer: correct,
        explanation: source_explanation(self.lang, self.title, section, note),
        source_article_title: self.title.to_string(),
        source_section: section.to_string(),
        accepted_answers: Vec::new(),
        source_article_slug: None,
        explanation_context: None,
      },
    }
  }
}

fn definition_drafts<R: Rng + ?Sized>(
  index: &ContentIndex,
  lang: Lang,
  scoped: &ScopedData<'_>,
  rng: &mut R,
) -> Vec<QuestionDraft> {
  let all_schools = index.all_schools();
  let mut out = Vec::with_capacity(scoped.articles.len() * 2);

  for article in &scoped.articles {
    let title = article.title.get(lang);
    let summary = article.summary.get(lang);
    let draft = Draft { lang, title, section: Section::Summary };

    let mut options = vec![article.school.clone()];
    options.extend(pick_distractors(&all_schools, &article.school, 3, rng));
    let prefix = lang.pick(
      "Which school is best described by this summary?",
      "Quyidagi xulosa qaysi maktabni ifodalaydi?",
    );
    out.push(draft.build(
      create_id("def-mcq", rng),
      Category::Definition,
      QuestionType::MultipleChoice,
      format!("{}\n\"{}\"", prefix, summary),
      Some(shuffle(&options, rng)),
      AnswerValue::Text(article.school.clone()),
      lang.pick(
        "The summary directly captures this school's orientation.",
        "Xulosa ushbu maktabning asosiy yonalishini ifodalaydi.",
      ),
    ));

    // With no other school to name, the claim can only be the true one.
    let wrong_school = pick_distractors(&all_schools, &article.school, 1, rng).pop();
    let coin = rng.gen_bool(0.5);
    let (is_true, claimed) = match wrong_school {
      Some(wrong) if !coin => (false, wrong),
      _ => (true, article.school.clone()),
    };
    let prompt = match lang {
      Lang::En => format!("True or False: \"{}\" describes {}.", summary, claimed),
      Lang::Uz => format!("Togri yoki Notogri: \"{}\" tavsifi {} maktabiga tegishli.", summary, claimed),
    };
    let note = match lang {
      Lang::En => format!("The article summary belongs to {}.", article.school),
      Lang::Uz => format!("Maqoladagi xulosa aslida {} maktabiga tegishli.", article.school),
    };
    out.push(draft.build(
      create_id("def-tf", rng),
      Category::Definition,
      QuestionType::TrueFalse,
      prompt,
      Some(true_false_options(lang)),
      AnswerValue::Bool(is_true),
      &note,
    ));
  }
  out
}

fn attribution_drafts<R: Rng + ?Sized>(
  index: &ContentIndex,
  lang: Lang,
  scoped: &ScopedData<'_>,
  rng: &mut R,
) -> Vec<QuestionDraft> {
  let all_schools = index.all_schools();
  let all_names = index.all_philosopher_names();
  let mut out = Vec::new();

  for article in &scoped.articles {
    let title = article.title.get(lang);
    let draft = Draft { lang, title, section: Section::Takeaways };

    for (i, takeaway) in article.key_takeaways.get(lang).iter().take(2).enumerate() {
      let mut options = vec![article.school.clone()];
      options.extend(pick_distractors(&all_schools, &article.school, 3, rng));
      let options = shuffle(&options, rng);

      let note = match lang {
        Lang::En => format!("This statement comes from the {} key takeaways section.", article.school),
        Lang::Uz => format!("Bu xulosa {} maqolasining asosiy fikrlar bolimidan olingan.", article.school),
      };
      out.push(draft.build(
        create_id(&format!("att-school-{}", i), rng),
        Category::Attribution,
        QuestionType::MultipleChoice,
        match lang {
          Lang::En => format!("Which school matches this idea?\n\"{}\"", takeaway),
          Lang::Uz => format!("Qaysi maktab ushbu goyaga mos keladi?\n\"{}\"", takeaway),
        },
        Some(options),
        AnswerValue::Text(article.school.clone()),
        &note,
      ));

      out.push(draft.build(
        create_id(&format!("att-short-{}", i), rng),
        Category::Attribution,
        QuestionType::ShortAnswer,
        match lang {
          Lang::En => format!("Type the school name associated with this claim:\n\"{}\"", takeaway),
          Lang::Uz => format!("Quyidagi fikr qaysi maktabga tegishli?\n\"{}\"", takeaway),
        },
        None,
        AnswerValue::Text(article.school.clone()),
        lang.pick(
          "The answer is verified from the article key takeaways.",
          "Javob maqolaning asosiy xulosalaridan tekshiriladi.",
        ),
      ));
    }
  }

  for philosopher in &scoped.philosophers {
    let title = match philosopher.related_articles.first().and_then(|slug| index.article(slug)) {
      Some(article) => article.title.get(lang).clone(),
      None => match lang {
        Lang::En => format!("{} profile", philosopher.name),
        Lang::Uz => format!("{} profili", philosopher.name),
      },
    };
    let draft = Draft { lang, title: &title, section: Section::Ideas };
    let name = &philosopher.name;

    for (i, idea) in philosopher.key_ideas.get(lang).iter().take(2).enumerate() {
      let mut options = vec![name.clone()];
      options.extend(pick_distractors(&all_names, name, 3, rng));
      let options = shuffle(&options, rng);

      let note = match lang {
        Lang::En => format!("This idea is listed under {}'s key ideas.", name),
        Lang::Uz => format!("Mazkur goya {}ning asosiy goyalari ichida berilgan.", name),
      };
      out.push(draft.build(
        create_id(&format!("att-philo-mcq-{}", i), rng),
        Category::Attribution,
        QuestionType::MultipleChoice,
        match lang {
          Lang::En => format!("Who is associated with this idea?\n\"{}\"", idea),
          Lang::Uz => format!("Ushbu goya kimga tegishli?\n\"{}\"", idea),
        },
        Some(options),
        AnswerValue::Text(name.clone()),
        &note,
      ));

      let wrong_name = pick_distractors(&all_names, name, 1, rng).pop();
      let coin = rng.gen_bool(0.5);
      let (is_true, presented) = match wrong_name {
        Some(wrong) if !coin => (false, wrong),
        _ => (true, name.clone()),
      };
      let note = match lang {
        Lang::En => format!("Correct attribution: {}.", name),
        Lang::Uz => format!("Asl boglanish: {}.", name),
      };
      out.push(draft.build(
        create_id(&format!("att-philo-tf-{}", i), rng),
        Category::Attribution,
        QuestionType::TrueFalse,
        match lang {
          Lang::En => format!("True or False: \"{}\" is linked to {}.", idea, presented),
          Lang::Uz => format!("Togri yoki Notogri: \"{}\" fikri {} bilan boglanadi.", idea, presented),
        },
        Some(true_false_options(lang)),
        AnswerValue::Bool(is_true),
        &note,
      ));

      out.push(draft.build(
        create_id(&format!("att-philo-short-{}", i), rng),
        Category::Attribution,
        QuestionType::ShortAnswer,
        match lang {
          Lang::En => format!("Type the philosopher connected to this idea:\n\"{}\"", idea),
          Lang::Uz => format!("Ushbu goya egasining ismini yozing:\n\"{}\"", idea),
        },
        None,
        AnswerValue::Text(name.clone()),
        lang.pick(
          "Checked against philosopher key ideas.",
          "Javob faylasufning asosiy goyalari bilan tekshirildi.",
        ),
      ));
    }
  }
  out
}

fn comparison_drafts<R: Rng + ?Sized>(
  index: &ContentIndex,
  lang: Lang,
  scoped: &ScopedData<'_>,
  rng: &mut R,
) -> Vec<QuestionDraft> {
  let all_schools = index.all_schools();
  let mut picked = shuffle(&scoped.articles, rng);
  picked.truncate(6);

  let mut out = Vec::new();
  for pair in picked.windows(2) {
    let (first, second) = (pair[0], pair[1]);
    let concept = |a: &Article| match a.concepts.first() {
      Some(slug) => index.concept_name(slug, lang),
      None => "concept".to_string(),
    };
    let (c1, c2) = (concept(first), concept(second));

    let title = first.title.get(lang);
    let draft = Draft { lang, title, section: Section::Comparison };

    let correct = format!("{} -> {}; {} -> {}", first.school, c1, second.school, c2);
    let swapped = format!("{} -> {}; {} -> {}", first.school, c2, second.school, c1);
    let other_school = pick_distractors(&all_schools, &first.school, 1, rng)
      .pop()
      .unwrap_or_else(|| first.school.clone());
    let wrong_school = format!("{} -> {}; {} -> {}", other_school, c1, second.school, c2);

    out.push(draft.build(
      create_id("cmp-mcq", rng),
      Category::Comparison,
      QuestionType::MultipleChoice,
      lang
        .pick(
          "Which pair correctly matches schools to concepts?",
          "Qaysi juftlik maktab va konseptni togri boglaydi?",
        )
        .to_string(),
      Some(shuffle(&unique([correct.clone(), swapped, wrong_school]), rng)),
      AnswerValue::Text(correct),
      lang.pick(
        "The comparison is built from concepts highlighted in selected articles.",
        "Taqqoslash ikki maqolaning asosiy konseptlariga tayangan.",
      ),
    ));

    let is_true = rng.gen_bool(0.5);
    let prompt = match (lang, is_true) {
      (Lang::En, true) => format!(
        "True or False: {} and {} pursue different emphases in {} and {}.",
        first.school, second.school, c1, c2
      ),
      (Lang::En, false) => format!(
        "True or False: {} and {} teach exactly the same emphasis in {}.",
        first.school, second.school, c1
      ),
      (Lang::Uz, true) => format!(
        "Togri yoki Notogri: {} va {} {} hamda {} masalasida turlicha urgu beradi.",
        first.school, second.school, c1, c2
      ),
      (Lang::Uz, false) => format!(
        "Togri yoki Notogri: {} va {} {} masalasida aynan bir xil urgu beradi.",
        first.school, second.school, c1
      ),
    };
    out.push(draft.build(
      create_id("cmp-tf", rng),
      Category::Comparison,
      QuestionType::TrueFalse,
      prompt,
      Some(true_false_options(lang)),
      AnswerValue::Bool(is_true),
      lang.pick(
        "This item relies on contrast between two schools in the dataset.",
        "Bu savol ikki maktab ortasidagi qiyosiy farqqa tayangan.",
      ),
    ));
  }
  out
}

/// Target counts (multiple choice, true/false, short answer) for a quiz of `total`.
/// Short answer takes whatever the rounding leaves, possibly zero.
pub fn type_targets(difficulty: Difficulty, total: usize) -> (usize, usize, usize) {
  let (w_mcq, w_tf) = match difficulty {
    Difficulty::Easy => (0.45, 0.45),
    Difficulty::Medium => (0.40, 0.30),
    Difficulty::Hard => (0.35, 0.20),
  };
  let mcq = (total as f64 * w_mcq).round() as usize;
  let tf = (total as f64 * w_tf).round() as usize;
  let short = total.saturating_sub(mcq + tf);
  (mcq, tf, short)
}

fn take_by_type<R: Rng + ?Sized>(
  pool: &[QuestionDraft],
  count: usize,
  kind: QuestionType,
  rng: &mut R,
) -> Vec<QuestionDraft> {
  let matching: Vec<QuestionDraft> = pool.iter().filter(|d| d.question.kind == kind).cloned().collect();
  let mut picked = shuffle(&matching, rng);
  picked.truncate(count);
  picked
}

/// Generate a quiz for `setup`. Returns fewer than `question_count` questions only
/// when the scoped content cannot produce enough drafts; an empty scope yields none.
#[instrument(level = "debug", target = "quiz", skip(index, rng), fields(scope = ?setup.scope, difficulty = ?setup.difficulty, count = setup.question_count))]
pub fn generate_quiz_questions<R: Rng + ?Sized>(index: &ContentIndex, setup: &QuizSetup, rng: &mut R) -> Vec<Question> {
  let lang = setup.language;
  let scoped = scope_data(index, setup.scope, setup.article_slug.as_deref());

  let mut pool = definition_drafts(index, lang, &scoped, rng);
  pool.extend(attribution_drafts(index, lang, &scoped, rng));
  pool.extend(comparison_drafts(index, lang, &scoped, rng));

  if pool.is_empty() {
    debug!(target: "quiz", "Empty draft pool");
    return Vec::new();
  }

  let (mcq, tf, short) = type_targets(setup.difficulty, setup.question_count);
  let mut selected = take_by_type(&pool, mcq, QuestionType::MultipleChoice, rng);
  selected.extend(take_by_type(&pool, tf, QuestionType::TrueFalse, rng));
  selected.extend(take_by_type(&pool, short, QuestionType::ShortAnswer, rng));

  if selected.len() < setup.question_count {
    let rest: Vec<QuestionDraft> = pool
      .iter()
      .filter(|d| !selected.iter().any(|s| s.question.id == d.question.id))
      .cloned()
      .collect();
    let mut backfill = shuffle(&rest, rng);
    backfill.truncate(setup.question_count - selected.len());
    selected.extend(backfill);
  }

  let mut quiz = shuffle(&selected, rng);
  quiz.truncate(setup.question_count);

  let definition = quiz.iter().filter(|d| d.category == Category::Definition).count();
  let comparison = quiz.iter().filter(|d| d.category == Category::Comparison).count();
  debug!(
    target: "quiz",
    pool = pool.len(),
    selected = quiz.len(),
    definition,
    attribution = quiz.len() - definition - comparison,
    comparison,
    "Quiz sampled"
  );

  quiz.into_iter().map(|d| d.question).collect()
}
