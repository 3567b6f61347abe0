//! crates/tcm_assistant_core/src/prompt.rs
//!
//! Builds the phase-specific system instruction that governs the model's
//! behavior for a turn. The wording tracks the consultation policy: intake
//! turns may only ask questions, assessment turns must produce exactly the
//! two labeled sections, extended-advice turns must stay inside the
//! retrieved material.

use crate::domain::{DialoguePhase, UserProfile};
use crate::parse::{ADVICE_MARKER, ANALYSIS_MARKER};

const NO_MATERIAL_PLACEHOLDER: &str = "（本次未检索到相关资料）";

fn knowledge_block(knowledge: &str) -> String {
    let body = if knowledge.trim().is_empty() {
        NO_MATERIAL_PLACEHOLDER
    } else {
        knowledge
    };
    format!("--- 检索到的资料 ---\n{body}\n--- 资料结束 ---")
}

fn profile_line(profile: &UserProfile) -> String {
    format!(
        "就诊者信息：{}，{}。",
        profile.gender.label(),
        profile.age_category().label()
    )
}

/// Composes the system instruction for the given phase.
pub fn compose(phase: DialoguePhase, profile: &UserProfile, knowledge: &str) -> String {
    match phase {
        DialoguePhase::Intake => intake_prompt(knowledge),
        DialoguePhase::Assessment => assessment_prompt(profile, knowledge),
        DialoguePhase::ExtendedAdvice => extended_prompt(profile, knowledge),
    }
}

fn intake_prompt(knowledge: &str) -> String {
    format!(
        r#"作为一名资深的中医专家，你的首要任务是进行严谨的"问诊"。用户刚刚提供了初步症状，你的唯一目标是提出2-3个关键的追问问题，以获取更全面的信息。请遵循以下规则：
1.  **禁止诊断**：在这一轮对话中，绝对不允许给出任何形式的证型判断或养生建议。
2.  **聚焦关键问题**: 你的问题必须围绕以下核心方面展开：
    - **既往病史与异常指标**: 例如："您以前是否有相关病史？近期体检有无异常指标？"
    - **症状持续时间**: 例如："这种情况持续多久了？"
    - **具体表现与诱因**: 例如："咳嗽是干咳还是有痰？什么情况下会加重？"
    - **伴随症状**: 根据初步症状，推断并询问可能被忽略的其他相关症状。例如，如果用户说"头痛"，你可以问"是否伴有恶心、畏光或鼻塞？"
3.  **引用知识**: 你可以参考以下检索到的资料来构思更专业的问题。
    {knowledge}
4.  **结尾引导**: 在提出问题后，以一句话引导用户回答，例如："请您补充这些信息，以便我能更准确地为您分析。"
你的回答必须直接以问题开始，简洁明了。"#,
        knowledge = knowledge_block(knowledge),
    )
}

fn assessment_prompt(profile: &UserProfile, knowledge: &str) -> String {
    format!(
        r#"作为一名资深的中医专家，你的任务是基于用户描述的症状及补充信息，结合本地知识库的资料，进行严谨的辨证分析。
{profile}
{knowledge}
请遵循以下规则进行回复：
1. **辨证分析**:
   - **优先引用**: 必须优先结合并引用"检索到的资料"进行分析。
   - **补充诊断**: 若资料不足以支撑诊断，你可以结合自身庞大的中医知识库进行补充和推断，但需明确告知用户"根据资料并结合我的知识判断..."。
   - **因人制宜**: 辨证时需结合就诊者的性别与年龄段特点进行分析。
2. **养生建议**:
   - 给出3-5条具体、可操作的非药物建议（如饮食、起居、运动、情绪调理）。
3. **格式要求**:
   - 回复必须分为"{analysis}"和"{advice}"两部分，不得出现其他章节。
   - 语言专业、沉稳、易于理解。"#,
        profile = profile_line(profile),
        knowledge = knowledge_block(knowledge),
        analysis = ANALYSIS_MARKER,
        advice = ADVICE_MARKER,
    )
}

fn extended_prompt(profile: &UserProfile, knowledge: &str) -> String {
    format!(
        r#"作为一名资深的中医专家，请严格依据以下从本地知识库检索到的资料，为用户提供专业的调理建议。
{profile}
{knowledge}
要求：
1. **内容来源**: 你的回答必须完全基于上述"检索到的资料"，绝不允许自行编撰。
2. **输出结构**: 分"一、膏方建议"、"二、茶饮建议"、"三、药膳建议"、"四、理疗建议"四个部分清晰作答。
3. **因人制宜**: 给出建议时需区分就诊者的性别与年龄段，说明相应的侧重或禁忌。
4. **专业性**: 语言专业、严谨，给出建议时可简要说明其适应证。
5. **补充原则**: 如果资料不全，无法覆盖所有四个方面，请仅就资料中有的部分作答，并明确指出"关于XX方面的建议，资料中暂未提及"。
6. **排版要求**: 不要使用缩进或多级列表，仅使用数字编号或符号列点。"#,
        profile = profile_line(profile),
        knowledge = knowledge_block(knowledge),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Gender;

    fn profile() -> UserProfile {
        UserProfile {
            gender: Gender::Female,
            age: Some(60),
        }
    }

    #[test]
    fn intake_forbids_diagnosis_and_demands_questions() {
        let prompt = compose(DialoguePhase::Intake, &profile(), "资料甲");
        assert!(prompt.contains("禁止诊断"));
        assert!(prompt.contains("2-3个关键的追问问题"));
        assert!(prompt.contains("既往病史"));
        assert!(prompt.contains("持续多久"));
        assert!(prompt.contains("伴随症状"));
        assert!(prompt.contains("直接以问题开始"));
        assert!(prompt.contains("资料甲"));
    }

    #[test]
    fn assessment_requires_both_sections_and_profile_context() {
        let prompt = compose(DialoguePhase::Assessment, &profile(), "资料乙");
        assert!(prompt.contains(ANALYSIS_MARKER));
        assert!(prompt.contains(ADVICE_MARKER));
        assert!(prompt.contains("优先引用"));
        assert!(prompt.contains("3-5条"));
        assert!(prompt.contains("女性"));
        assert!(prompt.contains("中年"));
    }

    #[test]
    fn extended_lists_four_sections_in_order() {
        let prompt = compose(DialoguePhase::ExtendedAdvice, &profile(), "资料丙");
        let positions: Vec<usize> = ["一、膏方建议", "二、茶饮建议", "三、药膳建议", "四、理疗建议"]
            .iter()
            .map(|s| prompt.find(s).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(prompt.contains("完全基于"));
        assert!(prompt.contains("资料中暂未提及"));
        assert!(prompt.contains("不要使用缩进"));
    }

    #[test]
    fn empty_knowledge_degrades_to_placeholder() {
        for phase in [
            DialoguePhase::Intake,
            DialoguePhase::Assessment,
            DialoguePhase::ExtendedAdvice,
        ] {
            let prompt = compose(phase, &profile(), "  ");
            assert!(prompt.contains("（本次未检索到相关资料）"));
        }
    }

    #[test]
    fn unknown_profile_is_still_described() {
        let prompt = compose(DialoguePhase::Assessment, &UserProfile::default(), "");
        assert!(prompt.contains("性别未知"));
        assert!(prompt.contains("年龄未知"));
    }
}
