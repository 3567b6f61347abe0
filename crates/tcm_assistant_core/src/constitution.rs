//! crates/tcm_assistant_core/src/constitution.rs
//!
//! The eight-question constitution questionnaire and its scorer. Scoring is a
//! pure function over the fixed question list; no other component feeds it.

/// One questionnaire item. Options are listed in score order, so an answer's
/// score is its option index + 1. For the first seven questions that runs
/// 没有=1 up to 总是=5; the eighth (平和质) lists its options reversed, which
/// gives the lower-is-healthier polarity the balanced type needs.
#[derive(Debug, Clone, Copy)]
pub struct ConstitutionQuestion {
    pub text: &'static str,
    pub options: [&'static str; 5],
    pub constitution: &'static str,
}

pub const QUESTIONS: [ConstitutionQuestion; 8] = [
    ConstitutionQuestion {
        text: "1. 您手脚发凉的情况多吗？",
        options: ["没有", "很少", "有时", "经常", "总是"],
        constitution: "阳虚质",
    },
    ConstitutionQuestion {
        text: "2. 您感到精力不济，容易疲乏吗？",
        options: ["没有", "很少", "有时", "经常", "总是"],
        constitution: "气虚质",
    },
    ConstitutionQuestion {
        text: "3. 您皮肤或口唇感觉干燥吗？",
        options: ["没有", "很少", "有时", "经常", "总是"],
        constitution: "阴虚质",
    },
    ConstitutionQuestion {
        text: "4. 您感觉身体沉重，或腹部肥满松软吗？",
        options: ["没有", "很少", "有时", "经常", "总是"],
        constitution: "痰湿质",
    },
    ConstitutionQuestion {
        text: "5. 您面部或鼻部是否总是油光发亮，易生粉刺？",
        options: ["没有", "很少", "有时", "经常", "总是"],
        constitution: "湿热质",
    },
    ConstitutionQuestion {
        text: "6. 您的皮肤在抓挠后是否容易出现紫色瘀斑？",
        options: ["没有", "很少", "有时", "经常", "总是"],
        constitution: "血瘀质",
    },
    ConstitutionQuestion {
        text: "7. 您是否经常感到情绪抑郁、紧张焦虑？",
        options: ["没有", "很少", "有时", "经常", "总是"],
        constitution: "气郁质",
    },
    ConstitutionQuestion {
        text: "8. 您是否精力充沛、面色红润、适应能力强？",
        options: ["是的", "大部分是", "有时是", "很少是", "不是"],
        constitution: "平和质",
    },
];

const DESCRIPTIONS: [(&str, &str); 8] = [
    (
        "平和质",
        "恭喜您！这是最健康的体质。形体匀称健壮，面色红润，精力充沛，适应能力强。请继续保持良好的生活习惯。",
    ),
    (
        "气虚质",
        "表现为元气不足，易疲乏，声音低弱，易出汗，易感冒。建议多食用补气健脾的食物，如山药、黄芪、大枣，并进行适度、缓和的锻炼。",
    ),
    (
        "阳虚质",
        "即\"火力不足\"，表现为畏寒怕冷，手脚冰凉，精神不振，大便稀溏。建议多吃温补肾阳的食物如羊肉、韭菜，并注意保暖，多晒太阳。",
    ),
    (
        "阴虚质",
        "体内津液精血等阴液亏少，表现为手足心热，口燥咽干，鼻微干，喜冷饮，大便干燥。建议多吃滋阴润燥的食物，如银耳、百合、梨，避免熬夜和辛辣食物。",
    ),
    (
        "痰湿质",
        "体内水湿停聚，表现为体形肥胖，腹部肥满，口黏苔腻，身体困重。建议饮食清淡，多吃健脾祛湿的食物如薏米、赤小豆，并增加运动量。",
    ),
    (
        "湿热质",
        "湿与热并存，表现为面垢油光，易生痤疮，口苦口干，大便黏滞。建议饮食清淡，多吃清热利湿的食物如绿豆、冬瓜、苦瓜，忌辛辣油腻。",
    ),
    (
        "血瘀质",
        "血液运行不畅，表现为面色晦暗，皮肤粗糙，易出现瘀斑，口唇暗淡。建议多进行可促进血液循环的运动，并可适量食用活血化瘀的食物如山楂、黑木耳。",
    ),
    (
        "气郁质",
        "气的运行不畅，表现为神情抑郁，情感脆弱，烦闷不乐，易失眠。建议多参加社交活动，听轻松音乐，多食用能行气解郁的食物如佛手、玫瑰花茶。",
    ),
];

pub const BALANCED_LABEL: &str = "平和质";
pub const MIXED_LABEL: &str = "混合或不明显体质";
const MIXED_DESCRIPTION: &str =
    "您的体质倾向不太明显，建议结合具体症状进行综合判断，并保持健康的生活方式。";

/// Rejected questionnaire input. Scoring never sees a malformed answer set.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("需要回答全部 {expected} 道题，实际收到 {got} 道")]
    WrongAnswerCount { expected: usize, got: usize },
    #[error("第 {question} 题的答案“{answer}”不在选项范围内")]
    InvalidOption { question: usize, answer: String },
}

fn description_for(label: &str) -> &'static str {
    DESCRIPTIONS
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, d)| *d)
        .unwrap_or(MIXED_DESCRIPTION)
}

/// Scores one answer against its question, validating the vocabulary.
fn answer_score(question_index: usize, answer: &str) -> Result<u8, ValidationError> {
    QUESTIONS[question_index]
        .options
        .iter()
        .position(|opt| *opt == answer)
        .map(|pos| pos as u8 + 1)
        .ok_or_else(|| ValidationError::InvalidOption {
            question: question_index + 1,
            answer: answer.to_string(),
        })
}

/// Maps a complete answer set to a constitution label and its description.
///
/// Decision rule:
/// 1. balanced score ≤ 2 and every other score < 3 → 平和质;
/// 2. otherwise the highest-scoring non-balanced type wins if it reaches 3,
///    earlier question order breaking ties;
/// 3. otherwise the mixed/unclear sentinel.
pub fn score(answers: &[String]) -> Result<(String, String), ValidationError> {
    if answers.len() != QUESTIONS.len() {
        return Err(ValidationError::WrongAnswerCount {
            expected: QUESTIONS.len(),
            got: answers.len(),
        });
    }

    let mut scores = [0u8; 8];
    for (i, answer) in answers.iter().enumerate() {
        scores[i] = answer_score(i, answer)?;
    }
    let balanced_score = scores[7];

    // Stable argmax over the seven non-balanced types, fixed question order.
    let mut max_index = 0;
    for i in 1..7 {
        if scores[i] > scores[max_index] {
            max_index = i;
        }
    }
    let max_score = scores[max_index];

    if balanced_score <= 2 && scores[..7].iter().all(|s| *s < 3) {
        return Ok((
            BALANCED_LABEL.to_string(),
            description_for(BALANCED_LABEL).to_string(),
        ));
    }

    if max_score >= 3 {
        let label = QUESTIONS[max_index].constitution;
        Ok((label.to_string(), description_for(label).to_string()))
    } else {
        Ok((MIXED_LABEL.to_string(), MIXED_DESCRIPTION.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(values: [&str; 8]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn all_clear_answers_score_balanced() {
        let result = score(&answers([
            "没有", "没有", "没有", "没有", "没有", "没有", "没有", "是的",
        ]))
        .unwrap();
        assert_eq!(result.0, BALANCED_LABEL);
    }

    #[test]
    fn single_dominant_question_selects_its_type() {
        // Question 4 is 痰湿质.
        let result = score(&answers([
            "没有", "没有", "没有", "总是", "没有", "没有", "没有", "不是",
        ]))
        .unwrap();
        assert_eq!(result.0, "痰湿质");
    }

    #[test]
    fn tie_breaks_toward_earlier_question() {
        // Questions 2 (气虚质) and 6 (血瘀质) both at the maximum.
        let result = score(&answers([
            "没有", "总是", "没有", "没有", "没有", "总是", "没有", "不是",
        ]))
        .unwrap();
        assert_eq!(result.0, "气虚质");
    }

    #[test]
    fn mild_scores_with_unbalanced_answer_give_mixed_sentinel() {
        // Nothing reaches 3, but Q8 = 不是 rules the balanced type out.
        let result = score(&answers([
            "很少", "很少", "很少", "很少", "很少", "很少", "很少", "不是",
        ]))
        .unwrap();
        assert_eq!(result.0, MIXED_LABEL);
    }

    #[test]
    fn moderate_symptom_beats_balanced_default() {
        // One type at 有时 (3) must win even though Q8 leans balanced.
        let result = score(&answers([
            "没有", "没有", "有时", "没有", "没有", "没有", "没有", "是的",
        ]))
        .unwrap();
        assert_eq!(result.0, "阴虚质");
    }

    #[test]
    fn short_answer_set_is_rejected() {
        let full = answers([
            "没有", "没有", "没有", "没有", "没有", "没有", "没有", "是的",
        ]);
        let result = score(&full[..5]);
        assert_eq!(
            result.unwrap_err(),
            ValidationError::WrongAnswerCount { expected: 8, got: 5 }
        );
    }

    #[test]
    fn out_of_vocabulary_answer_is_rejected() {
        // 是的 belongs to question 8, not question 1.
        let result = score(&answers([
            "是的", "没有", "没有", "没有", "没有", "没有", "没有", "是的",
        ]));
        assert_eq!(
            result.unwrap_err(),
            ValidationError::InvalidOption {
                question: 1,
                answer: "是的".to_string()
            }
        );
    }

    #[test]
    fn every_label_has_a_description() {
        for q in &QUESTIONS {
            assert!(!description_for(q.constitution).is_empty());
        }
    }
}
