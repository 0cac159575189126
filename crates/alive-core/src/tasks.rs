//! Fixed 28-day task catalog.
//!
//! One prompt per challenge day, compiled into the crate. Day indexes are
//! 1-based; anything outside 1..=28 is a caller error.

use serde::Serialize;

use crate::error::{CoreError, Result};

/// Number of days in the challenge.
pub const CHALLENGE_DAYS: u8 = 28;

/// One day's prompt card.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTask {
    pub day_index: u8,
    pub title: &'static str,
    pub instruction: &'static str,
    pub hint: Option<&'static str>,
}

/// Look up the task for a challenge day.
///
/// # Errors
/// `InvalidArgument` when `day_index` is outside 1..=28.
pub fn task_for_day(day_index: u8) -> Result<&'static DailyTask> {
    if day_index < 1 || day_index > CHALLENGE_DAYS {
        return Err(CoreError::InvalidArgument(format!(
            "dayIndex must be between 1 and {CHALLENGE_DAYS}, got {day_index}"
        )));
    }
    Ok(&CATALOG[(day_index - 1) as usize])
}

macro_rules! task {
    ($day:expr, $title:expr, $instruction:expr, $hint:expr) => {
        DailyTask {
            day_index: $day,
            title: $title,
            instruction: $instruction,
            hint: Some($hint),
        }
    };
}

static CATALOG: [DailyTask; CHALLENGE_DAYS as usize] = [
    // Week 1 -- noticing
    task!(1, "Arrive", "Write one sentence about why you started this challenge.", "No polish needed. The first sentence that comes is the right one."),
    task!(2, "One true thing", "Write down one thing that is true about today, however small.", "\"I drank water before coffee\" counts."),
    task!(3, "Body check", "Describe where in your body you feel today's mood.", "Shoulders, jaw, stomach -- pick one and describe it."),
    task!(4, "The ten-minute walk", "Take a ten-minute walk and note one thing you saw.", "Leave your phone in your pocket for the duration."),
    task!(5, "Name the noise", "Write down the thought that interrupted you most today.", "Naming it once is enough. You do not have to solve it."),
    task!(6, "Small win", "Record one thing you finished today, no matter the size.", "Finished, not perfect."),
    task!(7, "Week one echo", "Reread your first entry and write one sentence about what changed.", "Compare feelings, not achievements."),
    // Week 2 -- boundaries
    task!(8, "The first no", "Write about one thing you declined today, or wish you had.", "A delayed reply is also a no."),
    task!(9, "Time fence", "Pick one hour that belongs only to you today and say what you did with it.", "Defending the hour matters more than using it well."),
    task!(10, "Energy ledger", "List one thing that drained you and one that gave energy back.", "Just two lines. Keep the ledger honest."),
    task!(11, "The ask", "Write down one thing you asked someone for today.", "Asking for time counts. Asking for help counts double."),
    task!(12, "Screen sunset", "Note when you put screens away last night and how the morning felt.", "No judgment, only observation."),
    task!(13, "Borrowed worry", "Identify one worry you are carrying that belongs to someone else.", "You can care without carrying."),
    task!(14, "Halfway marker", "Describe the boundary from this week you most want to keep.", "Write it as a rule you could reread in a month."),
    // Week 3 -- connection
    task!(15, "One message", "Send one unprompted message to someone and note how it felt.", "Two sentences to them, one sentence here."),
    task!(16, "Listening day", "Recall a conversation where you mostly listened. What did you hear?", "What was said underneath the words?"),
    task!(17, "Old thread", "Reconnect with something you dropped -- a book, a hobby, a person.", "Ten minutes of it is a full reconnection."),
    task!(18, "Gratitude, specific", "Thank someone for one specific thing they did.", "Specific beats grand. \"Thanks for Tuesday\" works."),
    task!(19, "The difficult sentence", "Write the sentence you have been avoiding saying out loud.", "Writing it here is not the same as sending it. Start here."),
    task!(20, "Shared table", "Eat one meal today with someone, or call someone while you cook.", "Presence over menu."),
    task!(21, "Week three echo", "Write one sentence about who showed up for you this week.", "Include yourself if that is the honest answer."),
    // Week 4 -- consolidation
    task!(22, "Keep pile", "List three habits from this month you want to keep.", "Pick the ones that survived bad days, not the impressive ones."),
    task!(23, "Drop pile", "Name one thing from this month you are done with.", "Dropping it is a decision, not a failure."),
    task!(24, "Letter forward", "Write two sentences to yourself three months from now.", "Tell them what you know today."),
    task!(25, "The bad day plan", "Describe your minimum viable day: what you do when everything slips.", "One anchor action is a plan."),
    task!(26, "Borrowed eyes", "Describe this month as a good friend watching you would.", "Friends notice effort before results."),
    task!(27, "One sentence rule", "Condense the whole challenge into one sentence you believe.", "You will reread this one. Make it yours."),
    task!(28, "Close the loop", "Write your final entry: what stays with you after day 28?", "End where you began: one honest sentence is enough."),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_all_days() {
        for day in 1..=CHALLENGE_DAYS {
            let task = task_for_day(day).unwrap();
            assert_eq!(task.day_index, day);
            assert!(!task.title.is_empty());
            assert!(!task.instruction.is_empty());
        }
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert!(task_for_day(0).is_err());
        assert!(task_for_day(29).is_err());
    }

    #[test]
    fn titles_are_unique() {
        let mut titles: Vec<_> = CATALOG.iter().map(|t| t.title).collect();
        titles.sort_unstable();
        titles.dedup();
        assert_eq!(titles.len(), CHALLENGE_DAYS as usize);
    }
}
