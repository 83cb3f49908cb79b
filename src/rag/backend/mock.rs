//! In-process keyword matcher over a small fixed knowledge base.

use super::{AnswerBackend, BackendError, BackendRequest};
use crate::rag::protocol::{ParsedOutcome, ResultPayload, SourcePayload};
use async_trait::async_trait;

struct Topic {
    category: &'static str,
    keywords: &'static [&'static str],
    answer: &'static str,
    excerpts: &'static [(i64, &'static str)],
}

const TOPICS: &[Topic] = &[
    Topic {
        category: "licensing",
        keywords: &["g1", "license", "permit", "learner"],
        answer: "To get a G1 licence in Ontario you must be at least 16, bring acceptable \
identification, pass a vision test and pass the knowledge test on road signs and rules at a \
DriveTest centre. G1 drivers must ride with a fully licensed driver with at least four years of \
experience, keep a zero blood alcohol level, stay off 400-series highways and not drive between \
midnight and 5 a.m. The G1 must be held for 12 months (8 with an approved driver education \
course) before the G2 road test.",
        excerpts: &[
            (
                12,
                "To apply for a G1 licence you must be at least 16 years old, pass a vision test \
and pass a knowledge test about the rules of the road and traffic signs.",
            ),
            (
                14,
                "Level One drivers must maintain a blood alcohol level of zero and must not drive \
on 400-series highways or between midnight and 5 a.m.",
            ),
        ],
    },
    Topic {
        category: "speed_limits",
        keywords: &["speed", "limit", "highway", "city", "school"],
        answer: "The maximum speed on most 400-series highways is 100 km/h unless posted \
otherwise. Other provincial highways are usually 80 km/h, and cities, towns and villages default \
to 50 km/h. School and community safety zones carry lower posted limits and higher fines. Speed \
limits are maximums for ideal conditions; slow down for weather, traffic and construction.",
        excerpts: &[
            (
                42,
                "The maximum speed limit on most 400-series highways is 100 km/h. The limit is \
80 km/h on most other highways and 50 km/h in cities, towns and villages unless posted.",
            ),
            (
                43,
                "Speeding fines increase with the amount over the limit and are doubled in \
community safety zones and construction zones when workers are present.",
            ),
        ],
    },
    Topic {
        category: "highway_driving",
        keywords: &["highway", "400", "expressway", "merge", "passing"],
        answer: "G1 drivers may not use 400-series highways or high-speed expressways such as \
the QEW, the Gardiner Expressway or the Don Valley Parkway. On a highway, match traffic speed \
when merging from the acceleration lane, keep at least a two-second following distance, stay in \
the right lane except to pass and signal well before changing lanes or exiting.",
        excerpts: &[
            (
                58,
                "When entering a freeway, use the acceleration lane to reach the speed of traffic \
and merge smoothly into a safe gap.",
            ),
            (
                60,
                "Keep to the right except when passing, and check your blind spot before every \
lane change.",
            ),
        ],
    },
    Topic {
        category: "traffic_rules",
        keywords: &["school", "bus", "red", "lights", "stop", "children"],
        answer: "When a stopped school bus has its red lights flashing or stop arm out, traffic \
in both directions must stop, unless the road is divided by a median. Drivers behind the bus \
stop at least 20 metres back and may not move until the lights stop flashing. Passing a stopped \
school bus carries heavy fines and six demerit points for a first offence.",
        excerpts: &[(
            70,
            "You must stop whenever you approach a stopped school bus with its upper red lights \
flashing, whether you are behind the bus or approaching from the front on an undivided road.",
        )],
    },
    Topic {
        category: "safety",
        keywords: &["alcohol", "drinking", "blood", "limit", "impaired", "dui"],
        answer: "Fully licensed drivers face criminal charges at a blood alcohol concentration \
of 0.08 or more and immediate roadside suspensions in the warn range of 0.05 to 0.08. Novice \
drivers (G1, G2, M1, M2) and drivers 21 or under must have a blood alcohol level of zero. \
Penalties escalate for repeat occurrences and include licence suspension, vehicle impoundment \
and ignition interlock.",
        excerpts: &[
            (
                90,
                "It is illegal to drive with a blood alcohol concentration over 0.08. Drivers in \
the warn range of 0.05 to 0.08 face an immediate licence suspension.",
            ),
            (
                91,
                "Novice drivers and drivers 21 and under must not have any alcohol in their blood \
while driving.",
            ),
        ],
    },
];

const FALLBACK_ANSWER: &str = "I can help with Ontario driving rules such as G1 licensing, speed \
limits, highway driving, school bus safety and alcohol limits. Please ask about one of these \
topics.";

const FALLBACK_EXCERPTS: &[(i64, &str)] = &[(
    1,
    "The Official MTO Driver's Handbook covers licensing, rules of the road, safe driving \
practices and traffic signs for Ontario drivers.",
)];

/// Answer backend that scores a fixed topic table by keyword hits.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockKeywordBackend;

impl MockKeywordBackend {
    /// Construct the keyword backend.
    pub const fn new() -> Self {
        Self
    }

    fn best_topic(question: &str) -> Option<(&'static Topic, usize)> {
        let question = question.to_lowercase();
        let mut best: Option<(&Topic, usize)> = None;
        for topic in TOPICS {
            let hits = topic
                .keywords
                .iter()
                .filter(|keyword| question.contains(*keyword))
                .count();
            if hits > best.map_or(0, |(_, best_hits)| best_hits) {
                best = Some((topic, hits));
            }
        }
        best
    }
}

#[async_trait]
impl AnswerBackend for MockKeywordBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn answer(&self, request: BackendRequest) -> Result<ParsedOutcome, BackendError> {
        let (answer, category, excerpts, score) = match Self::best_topic(&request.question) {
            Some((topic, hits)) => (
                topic.answer,
                topic.category,
                topic.excerpts,
                hits as f64 / topic.keywords.len() as f64,
            ),
            None => (FALLBACK_ANSWER, "general", FALLBACK_EXCERPTS, 0.0),
        };

        let sources = excerpts
            .iter()
            .take(request.max_sources)
            .map(|(page, content)| SourcePayload {
                content: (*content).to_string(),
                page: *page,
                score,
                category: Some(category.to_string()),
            })
            .collect();

        Ok(ParsedOutcome::Result(ResultPayload {
            success: true,
            answer: answer.to_string(),
            sources,
            category: Some(category.to_string()),
            methods: vec!["keyword_match".to_string()],
            query_time: 0.0,
            chunks_processed: TOPICS.len() as u64,
            error: None,
            error_type: None,
        }))
    }
}
