use crate::config::Sport;
use crate::types::notification::{
    MatchEvent, NotificationAction, NotificationKind, NotificationPayload,
};

/// Localized strings for one sport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTexts {
    pub match_start: &'static str,
    pub match_ready: &'static str,
    pub test_title: &'static str,
}

impl NotificationTexts {
    pub fn for_sport(sport: Sport) -> Self {
        match sport {
            Sport::Badminton => Self {
                match_start: "🏸 경기 시작!",
                match_ready: "🏸 다음 경기 준비",
                test_title: "🏸 알림 테스트",
            },
            Sport::Tennis => Self {
                match_start: "🎾 경기 시작!",
                match_ready: "🎾 다음 경기 준비",
                test_title: "🎾 알림 테스트",
            },
        }
    }
}

pub fn match_payload(event: &MatchEvent, texts: &NotificationTexts) -> NotificationPayload {
    let (title, body) = match event.kind {
        NotificationKind::MatchStarting => (
            texts.match_start,
            format!(
                "코트 {}에서 경기가 시작됩니다!\n{} vs {}",
                event.court_number, event.team1, event.team2
            ),
        ),
        NotificationKind::MatchUpcoming => (
            texts.match_ready,
            format!(
                "코트 {} 다음 경기에 출전합니다. 준비해주세요!\n{} vs {}",
                event.court_number, event.team1, event.team2
            ),
        ),
    };

    NotificationPayload {
        title: title.to_string(),
        body,
        tag: format!("match-{}", event.match_id),
        url: format!("/my?tid={}&highlight={}", event.tournament_id, event.match_id),
        match_id: Some(event.match_id),
        court_number: Some(event.court_number),
        tournament_id: Some(event.tournament_id),
        actions: vec![
            NotificationAction {
                action: "open".to_string(),
                title: "내 경기 보기".to_string(),
            },
            NotificationAction {
                action: "dismiss".to_string(),
                title: "확인".to_string(),
            },
        ],
    }
}

pub fn test_payload(
    tournament_id: i64,
    participant_name: &str,
    texts: &NotificationTexts,
) -> NotificationPayload {
    NotificationPayload {
        title: texts.test_title.to_string(),
        body: format!("{participant_name}님, 알림이 정상적으로 작동합니다!"),
        tag: "test".to_string(),
        url: format!("/my?tid={tournament_id}"),
        match_id: None,
        court_number: None,
        tournament_id: None,
        actions: Vec::new(),
    }
}
