use crate::models::review::{RatingSummary, Viewer, VoteDirection};
use crate::reconciler::{vote_hint, ReviewBoard};
use leptos::*;

/// Reviews of one course with vote and report controls.
#[component]
pub fn ReviewsList(
    board: RwSignal<ReviewBoard>,
    viewer: Option<Viewer>,
    on_vote: Callback<(String, VoteDirection)>,
    on_report: Callback<String>,
) -> impl IntoView {
    view! {
        <div class="reviews">
            <h3>{ "Reviews" }</h3>
            {move || board.with(|b| {
                let summary = RatingSummary::from_reviews(b.reviews());
                let headline = format!("{:.1}", summary.average);
                let star_row = format!("{}{}", "★".repeat(summary.filled_stars()), "☆".repeat(5 - summary.filled_stars().min(5)));
                let based_on = format!("Based on {} reviews", summary.total);
                let rows = (1..=5u8).rev().map(|stars| {
                    let label = format!("{} ★", stars);
                    let share = format!("{} ({}%)", summary.count(stars), summary.percentage(stars));
                    let width = format!("width: {}%", summary.percentage(stars));
                    view! {
                        <li>
                            <span class="stars">{ label }</span>
                            <span class="bar"><span class="fill" style=width></span></span>
                            <span class="share">{ share }</span>
                        </li>
                    }
                }).collect::<Vec<_>>();
                view! {
                    <div class="rating-summary">
                        <div class="average">{ headline }</div>
                        <div class="stars">{ star_row }</div>
                        <small>{ based_on }</small>
                        <ul class="distribution">{ rows }</ul>
                    </div>
                }
            })}
            <Show
                when=move || board.with(|b| !b.reviews().is_empty())
                fallback=|| view! { <p class="empty">{ "No reviews yet" }</p> }
            >
                <ul>
                    {
                        let viewer = viewer.clone();
                        move || board.with(|b| {
                            b.reviews().iter().map(|review| {
                                let viewer = viewer.as_ref();
                                let own = viewer.map(|v| review.is_authored_by(v)).unwrap_or(false);
                                let locked = viewer.is_none() || own;
                                let up_id = review.id.clone();
                                let down_id = review.id.clone();
                                let report_id = review.id.clone();
                                let score_class = match review.vote_score {
                                    s if s > 0 => "score positive",
                                    s if s < 0 => "score negative",
                                    _ => "score",
                                };
                                let up_class = if review.user_vote == Some(VoteDirection::Up) { "vote active" } else { "vote" };
                                let down_class = if review.user_vote == Some(VoteDirection::Down) { "vote active" } else { "vote" };
                                let rating = format!("Rating: {}/5", review.rating);
                                let comment = review.comment.clone();
                                let posted = review.created_at.format("%b %e, %Y").to_string();
                                let up_title = vote_hint(review, viewer, VoteDirection::Up);
                                let down_title = vote_hint(review, viewer, VoteDirection::Down);
                                let report_title = b.report_hint(review, viewer);
                                let report_locked = locked || b.has_reported(&review.id);
                                let score = if review.vote_score > 0 {
                                    format!("+{}", review.vote_score)
                                } else {
                                    review.vote_score.to_string()
                                };
                                view! {
                                    <li>
                                        <div class="rating">{ rating }</div>
                                        <p>{ comment }</p>
                                        <small>{ posted }</small>
                                        <div class="votes">
                                            <button
                                                class=up_class
                                                title=up_title
                                                disabled=locked
                                                on:click=move |_| on_vote.call((up_id.clone(), VoteDirection::Up))
                                            >
                                                { "▲" }
                                            </button>
                                            <span class=score_class>{ score }</span>
                                            <button
                                                class=down_class
                                                title=down_title
                                                disabled=locked
                                                on:click=move |_| on_vote.call((down_id.clone(), VoteDirection::Down))
                                            >
                                                { "▼" }
                                            </button>
                                            <button
                                                class="report"
                                                title=report_title
                                                disabled=report_locked
                                                on:click=move |_| on_report.call(report_id.clone())
                                            >
                                                { "Report" }
                                            </button>
                                        </div>
                                    </li>
                                }
                            }).collect::<Vec<_>>()
                        })
                    }
                </ul>
            </Show>
        </div>
    }
}
