//! Poll and voting service.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, FixedOffset, Utc};
use club_common::{AppError, AppResult, IdGenerator};
use club_db::{
    entities::{poll, poll_choice, user, vote},
    repositories::{PollRepository, ProfileRepository, UserRepository, VoteRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use super::media::MediaService;

/// A choice as submitted when creating a poll.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct ChoiceInput {
    #[validate(length(max = 200, message = "Choice text must be at most 200 characters."))]
    pub text: String,

    #[serde(default)]
    pub description: String,
}

/// Input for creating a poll.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct CreatePollInput {
    #[serde(default)]
    #[validate(length(max = 200, message = "Title must be at most 200 characters."))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub is_active: Option<bool>,

    pub closes_at: Option<DateTime<FixedOffset>>,

    #[serde(default)]
    #[validate(nested)]
    pub choices: Vec<ChoiceInput>,
}

/// Input for editing a poll. Absent fields keep their value.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct UpdatePollInput {
    #[validate(length(max = 200, message = "Title must be at most 200 characters."))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub is_active: Option<bool>,

    /// `Some(None)` clears the closing time.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub closes_at: Option<Option<DateTime<FixedOffset>>>,
}

fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A member who voted for a choice.
#[derive(Debug, Clone)]
pub struct Voter {
    pub user: user::Model,
    pub avatar_url: Option<String>,
}

/// A choice with its tally.
#[derive(Debug, Clone)]
pub struct ChoiceDetail {
    pub choice: poll_choice::Model,
    pub vote_count: u64,
    /// Newest vote first.
    pub voters: Vec<Voter>,
    pub percentage: f64,
}

/// A poll with tallies for every choice.
#[derive(Debug, Clone)]
pub struct PollDetail {
    pub poll: poll::Model,
    pub creator: Option<user::Model>,
    pub choices: Vec<ChoiceDetail>,
    pub total_votes: u64,
    /// Choice the viewing member currently votes for.
    pub user_vote: Option<String>,
}

/// A poll as shown in lists.
#[derive(Debug, Clone)]
pub struct PollSummary {
    pub poll: poll::Model,
    pub creator: Option<user::Model>,
    pub choice_count: u64,
    pub total_votes: u64,
}

/// Share of the votes, in percent rounded to one decimal. Zero when nobody
/// voted.
#[must_use]
pub fn vote_percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}

/// Poll service for business logic.
#[derive(Clone)]
pub struct PollService {
    poll_repo: PollRepository,
    vote_repo: VoteRepository,
    user_repo: UserRepository,
    profile_repo: ProfileRepository,
    media: MediaService,
    id_gen: IdGenerator,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        vote_repo: VoteRepository,
        user_repo: UserRepository,
        profile_repo: ProfileRepository,
        media: MediaService,
    ) -> Self {
        Self {
            poll_repo,
            vote_repo,
            user_repo,
            profile_repo,
            media,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a poll by ID.
    pub async fn get(&self, id: &str) -> AppResult<poll::Model> {
        self.poll_repo.get_by_id(id).await
    }

    /// The poll currently open for voting, if any.
    pub async fn active_poll(&self) -> AppResult<Option<poll::Model>> {
        self.poll_repo.find_first_active().await
    }

    /// List polls with choice and vote counts.
    pub async fn list_summaries(&self, active_only: bool) -> AppResult<Vec<PollSummary>> {
        let polls = self.poll_repo.find_all(active_only).await?;
        let ids: Vec<String> = polls.iter().map(|p| p.id.clone()).collect();

        let mut choice_counts: HashMap<String, u64> = HashMap::new();
        for choice in self.poll_repo.find_choices_for(&ids).await? {
            *choice_counts.entry(choice.poll_id).or_default() += 1;
        }
        let vote_counts = self.vote_repo.count_by_polls(&ids).await?;
        let creators = self.creators(polls.iter().filter_map(|p| p.created_by.clone())).await?;

        Ok(polls
            .into_iter()
            .map(|poll| PollSummary {
                choice_count: choice_counts.get(&poll.id).copied().unwrap_or(0),
                total_votes: vote_counts.get(&poll.id).copied().unwrap_or(0),
                creator: poll.created_by.as_ref().and_then(|id| creators.get(id).cloned()),
                poll,
            })
            .collect())
    }

    async fn creators(
        &self,
        ids: impl Iterator<Item = String>,
    ) -> AppResult<HashMap<String, user::Model>> {
        let ids: Vec<String> = ids.collect::<BTreeSet<_>>().into_iter().collect();
        Ok(self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect())
    }

    /// Create a poll with its choices.
    pub async fn create_poll(
        &self,
        creator: &user::Model,
        input: CreatePollInput,
    ) -> AppResult<(poll::Model, Vec<poll_choice::Model>)> {
        input.validate()?;

        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required.".to_string()));
        }
        if input.choices.is_empty() {
            return Err(AppError::Validation(
                "A poll needs at least one choice.".to_string(),
            ));
        }
        if input.choices.iter().any(|c| c.text.trim().is_empty()) {
            return Err(AppError::Validation("Choice text is required.".to_string()));
        }

        let poll_id = self.id_gen.generate();
        let model = poll::ActiveModel {
            id: Set(poll_id.clone()),
            title: Set(title),
            description: Set(input.description.trim().to_string()),
            created_by: Set(Some(creator.id.clone())),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(Utc::now().fixed_offset()),
            closes_at: Set(input.closes_at),
        };

        let choices = input
            .choices
            .into_iter()
            .enumerate()
            .map(|(position, choice)| poll_choice::ActiveModel {
                id: Set(self.id_gen.generate()),
                poll_id: Set(poll_id.clone()),
                text: Set(choice.text.trim().to_string()),
                description: Set(choice.description.trim().to_string()),
                position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
            })
            .collect();

        let (poll, choices) = self.poll_repo.create_with_choices(model, choices).await?;

        tracing::info!(poll_id = %poll.id, choices = choices.len(), created_by = %creator.id, "Poll created");
        Ok((poll, choices))
    }

    fn check_owner(poll: &poll::Model, actor: &user::Model) -> AppResult<()> {
        if actor.is_staff || poll.created_by.as_deref() == Some(actor.id.as_str()) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only the poll creator or staff can change this poll.".to_string(),
            ))
        }
    }

    /// Edit a poll. Creator or staff only.
    pub async fn update_poll(
        &self,
        actor: &user::Model,
        id: &str,
        input: UpdatePollInput,
    ) -> AppResult<poll::Model> {
        input.validate()?;
        let poll = self.poll_repo.get_by_id(id).await?;
        Self::check_owner(&poll, actor)?;

        let mut active: poll::ActiveModel = poll.into();
        if let Some(title) = input.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(AppError::Validation("Title is required.".to_string()));
            }
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(description.trim().to_string());
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(closes_at) = input.closes_at {
            active.closes_at = Set(closes_at);
        }

        self.poll_repo.update(active).await
    }

    /// Delete a poll with its choices and votes. Creator or staff only.
    pub async fn delete_poll(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let poll = self.poll_repo.get_by_id(id).await?;
        Self::check_owner(&poll, actor)?;
        self.poll_repo.delete(&poll.id).await?;
        tracing::info!(poll_id = %poll.id, deleted_by = %actor.id, "Poll deleted");
        Ok(())
    }

    /// Append a choice to a poll. Creator or staff only.
    pub async fn add_choice(
        &self,
        actor: &user::Model,
        poll_id: &str,
        input: ChoiceInput,
    ) -> AppResult<poll_choice::Model> {
        input.validate()?;
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        Self::check_owner(&poll, actor)?;

        let text = input.text.trim().to_string();
        if text.is_empty() {
            return Err(AppError::Validation("Choice text is required.".to_string()));
        }

        let position = self.poll_repo.next_choice_position(&poll.id).await?;
        let model = poll_choice::ActiveModel {
            id: Set(self.id_gen.generate()),
            poll_id: Set(poll.id),
            text: Set(text),
            description: Set(input.description.trim().to_string()),
            position: Set(position),
        };

        self.poll_repo.create_choice(model).await
    }

    /// Cast or change a member's vote in a poll.
    ///
    /// Any earlier vote of the member in this poll is replaced; the member
    /// ends up with exactly one vote there.
    pub async fn cast_vote(
        &self,
        poll_id: &str,
        choice_id: Option<&str>,
        voter: &user::Model,
    ) -> AppResult<vote::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;

        let choice_id = choice_id
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::BadRequest("choice_id is required".to_string()))?;

        let choice = self
            .poll_repo
            .find_choice(choice_id)
            .await?
            .filter(|c| c.poll_id == poll.id)
            .ok_or_else(|| AppError::BadRequest("Invalid choice for this poll".to_string()))?;

        let model = vote::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(voter.id.clone()),
            choice_id: Set(choice.id.clone()),
            poll_id: Set(poll.id.clone()),
            voted_at: Set(Utc::now().fixed_offset()),
        };

        let vote = self.vote_repo.replace_vote(model).await?;

        tracing::info!(poll_id = %poll.id, choice_id = %choice.id, user_id = %voter.id, "Vote cast");
        Ok(vote)
    }

    /// Tally a poll for display.
    pub async fn poll_detail(
        &self,
        poll: poll::Model,
        viewer: Option<&user::Model>,
    ) -> AppResult<PollDetail> {
        let choices = self.poll_repo.find_choices(&poll.id).await?;
        let votes = self.vote_repo.find_by_poll_with_users(&poll.id).await?;
        let total_votes = votes.len() as u64;

        let voter_ids: Vec<String> = votes.iter().map(|(v, _)| v.user_id.clone()).collect();
        let avatars: HashMap<String, Option<String>> = self
            .profile_repo
            .find_by_user_ids(&voter_ids)
            .await?
            .into_iter()
            .map(|p| (p.user_id, p.avatar))
            .collect();

        let user_vote = viewer.and_then(|viewer| {
            votes
                .iter()
                .find(|(v, _)| v.user_id == viewer.id)
                .map(|(v, _)| v.choice_id.clone())
        });

        let choices = choices
            .into_iter()
            .map(|choice| {
                let voters: Vec<Voter> = votes
                    .iter()
                    .filter(|(v, _)| v.choice_id == choice.id)
                    .filter_map(|(_, u)| u.clone())
                    .map(|user| Voter {
                        avatar_url: self.media.url(
                            avatars.get(&user.id).and_then(Option::as_deref),
                        ),
                        user,
                    })
                    .collect();
                let vote_count = votes.iter().filter(|(v, _)| v.choice_id == choice.id).count() as u64;
                ChoiceDetail {
                    choice,
                    vote_count,
                    voters,
                    percentage: vote_percentage(vote_count, total_votes),
                }
            })
            .collect();

        let creator = match &poll.created_by {
            Some(id) => self.user_repo.find_by_id(id).await?,
            None => None,
        };

        Ok(PollDetail {
            poll,
            creator,
            choices,
            total_votes,
            user_vote,
        })
    }

    /// Number of votes in a poll.
    pub async fn total_votes(&self, poll_id: &str) -> AppResult<u64> {
        self.vote_repo.count_by_poll(poll_id).await
    }
}
