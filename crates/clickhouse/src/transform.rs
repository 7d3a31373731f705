//! Staging-to-star-schema transforms.
//!
//! Five set-based `INSERT ... SELECT` statements. They only read the
//! staging tables, never each other, and append: running them twice over
//! the same staging data without a schema reset doubles the fact rows.
//!
//! Event times become `DateTime('UTC')` seconds, so `ts` outside 1970 to
//! 2106 saturates at the range ends.

use etl_core::{Phase, Step};

/// One row per distinct play: an event with `page = 'NextSong'` whose
/// (artist, song) matches a song record. Unmatched events are dropped by
/// the inner join.
pub const SONGPLAYS_INSERT: &str = r#"
INSERT INTO `songplays` (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
SELECT DISTINCT
    toDateTime(intDiv(assumeNotNull(se.ts), 1000), 'UTC'),
    assumeNotNull(se.userid),
    se.level,
    assumeNotNull(ss.song_id),
    assumeNotNull(ss.artist_id),
    se.sessionid,
    se.location,
    se.useragent
FROM `staging_events` AS se
INNER JOIN `staging_songs` AS ss
    ON ss.artist_name = se.artist
    AND ss.title = se.song
WHERE se.page = 'NextSong'
    AND se.ts IS NOT NULL
    AND se.userid IS NOT NULL
    AND ss.song_id IS NOT NULL
    AND ss.artist_id IS NOT NULL
"#;

/// Latest state wins: per user, the attributes of the `NextSong` event
/// with the greatest `ts`. The attributes travel as one tuple so they all
/// come from the same row, nulls included.
pub const USERS_INSERT: &str = r#"
INSERT INTO `users` (user_id, first_name, last_name, gender, level)
SELECT
    toString(assumeNotNull(userid)),
    tupleElement(latest, 1),
    tupleElement(latest, 2),
    tupleElement(latest, 3),
    tupleElement(latest, 4)
FROM
(
    SELECT
        userid,
        argMax((firstname, lastname, gender, level), ts) AS latest
    FROM `staging_events`
    WHERE page = 'NextSong'
        AND userid IS NOT NULL
        AND ts IS NOT NULL
    GROUP BY userid
)
"#;

/// One row per song id.
pub const SONGS_INSERT: &str = r#"
INSERT INTO `songs` (song_id, title, artist_id, year, duration)
SELECT
    assumeNotNull(song_id),
    tupleElement(info, 1),
    tupleElement(info, 2),
    tupleElement(info, 3),
    tupleElement(info, 4)
FROM
(
    SELECT
        song_id,
        any((assumeNotNull(title), assumeNotNull(artist_id), year, assumeNotNull(duration))) AS info
    FROM `staging_songs`
    WHERE song_id IS NOT NULL
        AND title IS NOT NULL
        AND artist_id IS NOT NULL
        AND duration IS NOT NULL
    GROUP BY song_id
)
"#;

/// One row per artist id, whatever number of songs the artist has.
pub const ARTISTS_INSERT: &str = r#"
INSERT INTO `artists` (artist_id, name, location, latitude, longitude)
SELECT
    assumeNotNull(artist_id),
    tupleElement(info, 1),
    tupleElement(info, 2),
    tupleElement(info, 3),
    tupleElement(info, 4)
FROM
(
    SELECT
        artist_id,
        any((artist_name, artist_location, artist_latitude, artist_longitude)) AS info
    FROM `staging_songs`
    WHERE artist_id IS NOT NULL
    GROUP BY artist_id
)
"#;

/// One row per distinct event second, split into calendar fields in UTC.
/// `week` is the ISO week; `weekday` counts from Sunday = 0.
pub const TIME_INSERT: &str = r#"
INSERT INTO `time` (start_time, hour, day, week, month, year, weekday)
SELECT
    start_time,
    toHour(start_time),
    toDayOfMonth(start_time),
    toISOWeek(start_time),
    toMonth(start_time),
    toYear(start_time),
    toDayOfWeek(start_time, 2)
FROM
(
    SELECT DISTINCT toDateTime(intDiv(assumeNotNull(ts), 1000), 'UTC') AS start_time
    FROM `staging_events`
    WHERE ts IS NOT NULL
)
"#;

/// The transform steps: fact table first, then the dimensions.
pub fn transform_steps() -> Vec<Step> {
    [
        ("insert songplays", SONGPLAYS_INSERT),
        ("insert users", USERS_INSERT),
        ("insert songs", SONGS_INSERT),
        ("insert artists", ARTISTS_INSERT),
        ("insert time", TIME_INSERT),
    ]
    .into_iter()
    .map(|(name, sql)| Step::new(Phase::Transform, name, sql.trim()))
    .collect()
}
