/* slots free end to end along a route
a band is usable only if the very same slots are free
on every link of the route */

use crate::dsa::interval_set::{IntervalSet, SlotInterval};
use crate::optical_network::mesh::Mesh;
use crate::optical_network::route::Route;

// intersection of the free bands of every link on `route`
// bands narrower than a positive `guard_band` are dropped,
// nothing is free on a route with a link `mesh` does not have
pub fn merge(mesh:&Mesh,route:&Route,guard_band:usize) -> Vec<SlotInterval> {
    let Some(links) = route.links().iter().map(|id| mesh.link(*id)).collect::<Option<Vec<_>>>() else {
        return Vec::new();
    };
    let mut links = links.into_iter();
    let Some(first) = links.next() else {return Vec::new()};
    let mut composed = first.spectrum().free_bands();
    for link in links {
        if composed.is_empty() {break}
        composed = IntervalSet::intersect(&composed,&link.spectrum().free_bands());
    }
    if guard_band > 0 {
        composed.retain(|band| band.width() >= guard_band);
    }
    composed
}

// restricts already merged bands to another list, e.g. a spectrum zone
pub fn merge_pair(a:&[SlotInterval],b:&[SlotInterval]) -> Vec<SlotInterval> {
    IntervalSet::intersect(a,b)
}

// the composed free band ending right below `band`
pub fn adjacent_below(mesh:&Mesh,route:&Route,band:&SlotInterval) -> Option<SlotInterval> {
    if band.first <= 1 {return None}
    merge(mesh,route,0).into_iter().find(|free| free.last + 1 == band.first)
}

// the composed free band starting right above `band`
pub fn adjacent_above(mesh:&Mesh,route:&Route,band:&SlotInterval) -> Option<SlotInterval> {
    merge(mesh,route,0).into_iter().find(|free| free.first == band.last + 1)
}

pub fn free_slots_below(mesh:&Mesh,route:&Route,band:&SlotInterval) -> usize {
    adjacent_below(mesh,route,band).map_or(0,|b| b.width())
}

pub fn free_slots_above(mesh:&Mesh,route:&Route,band:&SlotInterval) -> usize {
    adjacent_above(mesh,route,band).map_or(0,|b| b.width())
}
